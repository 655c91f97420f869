//! A minimal bounds-checked binary cursor, used by the GDEF/GSUB/GPOS reader
//! in `ot::layout`. Every read returns `Option`; a malformed offset or a
//! short buffer yields `None` rather than a panic (spec.md §7).

use std::convert::TryInto;
use std::marker::PhantomData;

pub trait FromData: Sized {
    const SIZE: usize;
    fn parse(data: &[u8]) -> Option<Self>;
}

macro_rules! impl_from_data_int {
    ($ty:ty) => {
        impl FromData for $ty {
            const SIZE: usize = std::mem::size_of::<$ty>();

            #[inline]
            fn parse(data: &[u8]) -> Option<Self> {
                data.get(0..Self::SIZE)
                    .map(|b| <$ty>::from_be_bytes(b.try_into().unwrap()))
            }
        }
    };
}

impl_from_data_int!(u8);
impl_from_data_int!(i8);
impl_from_data_int!(u16);
impl_from_data_int!(i16);
impl_from_data_int!(u32);
impl_from_data_int!(i32);

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default)]
pub struct Offset16(pub u16);

impl Offset16 {
    #[inline]
    pub fn to_usize(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl FromData for Offset16 {
    const SIZE: usize = 2;

    fn parse(data: &[u8]) -> Option<Self> {
        u16::parse(data).map(Offset16)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default)]
pub struct Offset32(pub u32);

impl Offset32 {
    #[inline]
    pub fn to_usize(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl FromData for Offset32 {
    const SIZE: usize = 4;

    fn parse(data: &[u8]) -> Option<Self> {
        u32::parse(data).map(Offset32)
    }
}

#[derive(Clone, Copy)]
pub struct Stream<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Stream<'a> {
    #[inline]
    pub fn new(data: &'a [u8]) -> Self {
        Stream { data, offset: 0 }
    }

    pub fn new_at(data: &'a [u8], offset: usize) -> Option<Self> {
        if offset > data.len() {
            None
        } else {
            Some(Stream { data, offset })
        }
    }

    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub fn tail(&self) -> Option<&'a [u8]> {
        self.data.get(self.offset..)
    }

    pub fn read<T: FromData>(&mut self) -> Option<T> {
        let v = T::parse(self.data.get(self.offset..)?)?;
        self.offset += T::SIZE;
        Some(v)
    }

    pub fn skip<T: FromData>(&mut self) {
        self.offset += T::SIZE;
    }

    pub fn advance(&mut self, n: usize) {
        self.offset += n;
    }

    pub fn read_array16<T: FromData>(&mut self) -> Option<LazyArray16<'a, T>> {
        let count: u16 = self.read()?;
        self.read_array_of_count16(count)
    }

    pub fn read_array_of_count16<T: FromData>(&mut self, count: u16) -> Option<LazyArray16<'a, T>> {
        let len = count as usize * T::SIZE;
        let data = self.data.get(self.offset..self.offset + len)?;
        self.offset += len;
        Some(LazyArray16 { data, count, phantom: PhantomData })
    }

    pub fn read_array32<T: FromData>(&mut self) -> Option<LazyArray32<'a, T>> {
        let count: u32 = self.read()?;
        let len = count as usize * T::SIZE;
        let data = self.data.get(self.offset..self.offset + len)?;
        self.offset += len;
        Some(LazyArray32 { data, count, phantom: PhantomData })
    }

    pub fn read_at<T: FromData>(data: &'a [u8], offset: usize) -> Option<T> {
        T::parse(data.get(offset..)?)
    }
}

#[derive(Clone, Copy)]
pub struct LazyArray16<'a, T> {
    data: &'a [u8],
    count: u16,
    phantom: PhantomData<T>,
}

impl<'a, T> Default for LazyArray16<'a, T> {
    fn default() -> Self {
        LazyArray16 { data: &[], count: 0, phantom: PhantomData }
    }
}

impl<'a, T: FromData> LazyArray16<'a, T> {
    pub fn len(&self) -> u16 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn get(&self, index: u16) -> Option<T> {
        if index >= self.count {
            return None;
        }
        let start = index as usize * T::SIZE;
        T::parse(self.data.get(start..)?)
    }

    pub fn binary_search_by<F>(&self, mut f: F) -> Option<(u16, T)>
    where
        F: FnMut(&T) -> std::cmp::Ordering,
    {
        use std::cmp::Ordering;

        let mut lo = 0i32;
        let mut hi = self.count as i32 - 1;
        while lo <= hi {
            let mid = (lo + hi) / 2;
            let v = self.get(mid as u16)?;
            match f(&v) {
                Ordering::Equal => return Some((mid as u16, v)),
                Ordering::Less => lo = mid + 1,
                Ordering::Greater => hi = mid - 1,
            }
        }
        None
    }

    pub fn iter(&self) -> LazyArrayIter16<'a, T> {
        LazyArrayIter16 { array: *self, index: 0 }
    }
}

pub struct LazyArrayIter16<'a, T> {
    array: LazyArray16<'a, T>,
    index: u16,
}

impl<'a, T: FromData> Iterator for LazyArrayIter16<'a, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let v = self.array.get(self.index)?;
        self.index += 1;
        Some(v)
    }
}

impl<'a, T: FromData> IntoIterator for LazyArray16<'a, T> {
    type Item = T;
    type IntoIter = LazyArrayIter16<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        LazyArrayIter16 { array: self, index: 0 }
    }
}

#[derive(Clone, Copy)]
pub struct LazyArray32<'a, T> {
    data: &'a [u8],
    count: u32,
    phantom: PhantomData<T>,
}

impl<'a, T> Default for LazyArray32<'a, T> {
    fn default() -> Self {
        LazyArray32 { data: &[], count: 0, phantom: PhantomData }
    }
}

impl<'a, T: FromData> LazyArray32<'a, T> {
    pub fn len(&self) -> u32 {
        self.count
    }

    pub fn get(&self, index: u32) -> Option<T> {
        if index >= self.count {
            return None;
        }
        let start = index as usize * T::SIZE;
        T::parse(self.data.get(start..)?)
    }

    pub fn iter(&self) -> LazyArrayIter32<'a, T> {
        LazyArrayIter32 { array: *self, index: 0 }
    }
}

pub struct LazyArrayIter32<'a, T> {
    array: LazyArray32<'a, T>,
    index: u32,
}

impl<'a, T: FromData> Iterator for LazyArrayIter32<'a, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let v = self.array.get(self.index)?;
        self.index += 1;
        Some(v)
    }
}
