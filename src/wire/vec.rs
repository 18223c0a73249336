// SPDX-License-Identifier: GPL-3.0-only
/*
 * Copyright (c) 2025 Code Construct
 */
use core::mem;

use deku::{
    DekuError, DekuReader, DekuWriter,
    ctx::{Endian, Limit},
    deku_error,
    no_std_io::{self, Read, Seek},
    reader::Reader,
    writer::Writer,
};

/// Bounded sequence of wire elements, sized by a count or byte length field.
#[derive(Debug)]
pub struct WireVec<T, const S: usize>(heapless::Vec<T, S>);

impl<T, const S: usize> Default for WireVec<T, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const S: usize> WireVec<T, S> {
    pub fn new() -> Self {
        Self(heapless::Vec::new())
    }

    pub fn last(&self) -> Option<&T> {
        self.0.last()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, item: T) -> Result<(), T> {
        self.0.push(item)
    }

    pub fn as_slice(&self) -> &[T] {
        self.0.as_slice()
    }

    pub fn iter(&self) -> core::slice::Iter<'_, T> {
        self.0.iter()
    }
}

fn reader_vec_with_predicate<'a, T, Ctx, Predicate, R: Read + Seek, const S: usize>(
    reader: &mut Reader<R>,
    capacity: Option<usize>,
    ctx: Ctx,
    mut predicate: Predicate,
) -> Result<WireVec<T, S>, DekuError>
where
    T: DekuReader<'a, Ctx>,
    Ctx: Copy,
    Predicate: FnMut(usize, &T) -> bool,
{
    if let Some(cap) = capacity
        && cap > S
    {
        return Err(deku_error!(
            DekuError::InvalidParam,
            "Provided capacity is larger than vector capacity",
            "{} exceeds {}",
            cap,
            S
        ));
    }
    if mem::size_of::<T>() == 0 {
        return Ok(WireVec::new());
    }

    let mut res = WireVec::new();

    let start_read = reader.bits_read;

    loop {
        let val = <T>::from_reader_with_ctx(reader, ctx)?;
        if res.push(val).is_err() {
            return Err(deku_error!(
                DekuError::InvalidParam,
                "Failed to insert item into WireVec"
            ));
        };

        let read = reader.bits_read - start_read;
        if res.last().is_some_and(|last| predicate(read, last)) {
            break;
        }
    }

    Ok(res)
}

impl<'a, T, Ctx, Predicate, const S: usize> DekuReader<'a, (Limit<T, Predicate>, Ctx)>
    for WireVec<T, S>
where
    T: DekuReader<'a, Ctx>,
    Ctx: Copy,
    Predicate: FnMut(&T) -> bool,
{
    fn from_reader_with_ctx<R: no_std_io::Read + no_std_io::Seek>(
        reader: &mut Reader<R>,
        (limit, inner_ctx): (Limit<T, Predicate>, Ctx),
    ) -> Result<Self, DekuError>
    where
        Self: Sized,
    {
        match limit {
            Limit::Count(mut count) => {
                // Handle the trivial case of reading an empty vector
                if count == 0 {
                    return Ok(WireVec::new());
                }

                // Otherwise, read until we have read `count` elements
                reader_vec_with_predicate(reader, Some(count), inner_ctx, move |_, _| {
                    count -= 1;
                    count == 0
                })
            }
            Limit::Until(_, _) => Err(deku_error!(
                DekuError::InvalidParam,
                "WireVec does not support predicate limits"
            )),
            Limit::ByteSize(size) => {
                let bit_size = size.0 * 8;

                // Handle the trivial case of reading an empty vector
                if bit_size == 0 {
                    return Ok(WireVec::new());
                }

                reader_vec_with_predicate(reader, None, inner_ctx, move |read_bits, _| {
                    read_bits == bit_size
                })
            }
            Limit::BitSize(_) | Limit::End => Err(deku_error!(
                DekuError::InvalidParam,
                "WireVec requires a count or byte size limit"
            )),
        }
    }
}

impl<'a, T, const S: usize> DekuReader<'a, Endian> for WireVec<T, S>
where
    T: DekuReader<'a, Endian>,
{
    fn from_reader_with_ctx<R: no_std_io::Read + no_std_io::Seek>(
        reader: &mut Reader<R>,
        endian: Endian,
    ) -> Result<Self, DekuError>
    where
        Self: Sized,
    {
        let mut res: WireVec<T, S> = WireVec::new();
        let mut i = S;

        while i != 0 {
            let val = <T>::from_reader_with_ctx(reader, endian)?;
            if res.push(val).is_err() {
                return Err(deku_error!(
                    DekuError::InvalidParam,
                    "Failed to insert item into WireVec"
                ));
            };
            i -= 1;
        }

        Ok(res)
    }
}

impl<T: DekuWriter<Ctx>, Ctx: Copy, const S: usize> DekuWriter<Ctx> for WireVec<T, S> {
    fn to_writer<W: no_std_io::Write + no_std_io::Seek>(
        &self,
        writer: &mut Writer<W>,
        inner_ctx: Ctx,
    ) -> Result<(), DekuError> {
        for v in &self.0 {
            v.to_writer(writer, inner_ctx)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use deku::{
        DekuReader,
        ctx::{Endian, Limit},
        no_std_io::Cursor,
        reader::Reader,
    };

    use super::WireVec;

    #[test]
    fn count() {
        let test_data = [0x01u8, 0x00, 0x02, 0x00, 0x03, 0x00];

        let mut cursor = Cursor::new(&test_data);
        let mut reader = Reader::new(&mut cursor);
        let v = WireVec::<u16, 4>::from_reader_with_ctx(
            &mut reader,
            (Limit::new_count(2), Endian::Little),
        )
        .unwrap();
        assert_eq!(v.as_slice(), &[1, 2]);
    }

    #[test]
    fn empty() {
        let test_data = [0u8; 2];

        let mut cursor = Cursor::new(&test_data);
        let mut reader = Reader::new(&mut cursor);
        let v = WireVec::<u16, 4>::from_reader_with_ctx(
            &mut reader,
            (Limit::new_count(0), Endian::Little),
        )
        .unwrap();
        assert!(v.is_empty());
    }

    #[test]
    fn over_capacity() {
        let test_data = [0u8; 8];

        let mut cursor = Cursor::new(&test_data);
        let mut reader = Reader::new(&mut cursor);
        assert!(
            WireVec::<u16, 2>::from_reader_with_ctx(
                &mut reader,
                (Limit::new_count(3), Endian::Little),
            )
            .is_err()
        );
    }
}
