//! Index-addressed storage for graph nodes.
use std::{marker::PhantomData, ops};

/// A key into an [IndexedMap].
pub trait IndexRef: Copy + Eq {
    fn index(&self) -> usize;
    fn new(input: usize) -> Self;
}

#[macro_export]
/// Implements [IndexRef] for a newtype wrapping an unsigned integer. The
/// backing type defaults to [`u32`].
macro_rules! impl_index {
    ($struct_name: ident) => {
        $crate::impl_index!($struct_name, u32);
    };

    ($struct_name: ident, $backing_ty: ty) => {
        impl $crate::IndexRef for $struct_name {
            fn index(&self) -> usize {
                self.0 as usize
            }

            fn new(input: usize) -> Self {
                Self(input as $backing_ty)
            }
        }

        impl From<$backing_ty> for $struct_name {
            fn from(input: $backing_ty) -> Self {
                $struct_name(input)
            }
        }
    };
}

/// A vector addressed by a typed index. Entries are never removed, so keys
/// stay valid for the lifetime of the map.
#[derive(Debug, Clone)]
pub struct IndexedMap<K, D>
where
    K: IndexRef,
{
    data: Vec<D>,
    phantom: PhantomData<K>,
}

impl<K, D> ops::Index<K> for IndexedMap<K, D>
where
    K: IndexRef,
{
    type Output = D;

    fn index(&self, index: K) -> &Self::Output {
        &self.data[index.index()]
    }
}

impl<K, D> ops::IndexMut<K> for IndexedMap<K, D>
where
    K: IndexRef,
{
    fn index_mut(&mut self, index: K) -> &mut Self::Output {
        &mut self.data[index.index()]
    }
}

impl<K, D> IndexedMap<K, D>
where
    K: IndexRef,
{
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            phantom: PhantomData,
        }
    }

    pub fn with_capacity(size: usize) -> Self {
        Self {
            data: Vec::with_capacity(size),
            phantom: PhantomData,
        }
    }

    pub fn get(&self, index: K) -> Option<&D> {
        self.data.get(index.index())
    }

    pub fn get_mut(&mut self, index: K) -> Option<&mut D> {
        self.data.get_mut(index.index())
    }

    /// Store `item` and return its key.
    pub fn push(&mut self, item: D) -> K {
        let idx = K::new(self.data.len());
        self.data.push(item);
        idx
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = K> + use<K, D> {
        (0..self.data.len()).map(K::new)
    }

    pub fn iter(&self) -> impl Iterator<Item = (K, &D)> {
        self.data.iter().enumerate().map(|(i, d)| (K::new(i), d))
    }

    pub fn values(&self) -> impl Iterator<Item = &D> {
        self.data.iter()
    }
}

impl<K, D> Default for IndexedMap<K, D>
where
    K: IndexRef,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    struct Key(u32);
    impl_index!(Key);

    #[test]
    fn keys_are_dense() {
        let mut map: IndexedMap<Key, &str> = IndexedMap::new();
        let a = map.push("a");
        let b = map.push("b");
        assert_eq!((a, b), (Key(0), Key(1)));
        assert_eq!(map[b], "b");
        map[a] = "z";
        assert_eq!(map.iter().collect::<Vec<_>>(), vec![(a, &"z"), (b, &"b")]);
        assert_eq!(map.get(Key(2)), None);
        assert_eq!(map.keys().count(), 2);
    }
}
