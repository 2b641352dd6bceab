//! Collection adapters.
//!
//! The codecs never name a concrete container type: sequences and
//! dictionaries are driven through these two capability bundles, kept as
//! separate traits so a list-shaped adapter can never be read as a
//! dict-shaped one. Iteration is internal (`visit`), so the only iterator
//! state is the implementor's stack frame, so there is no heap allocation on the
//! iteration path.
use {
    crate::{
        error::{append_rejected, Result},
        value::{MapKey, Value},
    },
    std::collections::{BTreeMap, HashMap, LinkedList, VecDeque},
};

/// List-shaped adapter.
pub trait Sequence {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fixed element capacity, when the container has one. Decoding more
    /// elements than this fails up front with
    /// [`Error::DestinationTooSmall`](crate::Error::DestinationTooSmall).
    fn capacity(&self) -> Option<usize> {
        None
    }

    /// Yield each element in order; stops at the first callback error.
    fn visit(&self, f: &mut dyn FnMut(&Value) -> Result<()>) -> Result<()>;

    /// Append one element, failing on capacity.
    fn append(&mut self, value: Value) -> Result<()>;
}

/// Dict-shaped adapter.
pub trait Dictionary {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Yield each pair; stops at the first callback error. Iteration
    /// order is the container's own (insertion, sorted, or arbitrary).
    fn visit_pairs(&self, f: &mut dyn FnMut(&MapKey, &Value) -> Result<()>) -> Result<()>;

    /// Insert one pair, failing on a duplicate key or capacity.
    fn insert_pair(&mut self, key: MapKey, value: Value) -> Result<()>;
}

impl Sequence for Vec<Value> {
    fn len(&self) -> usize {
        self.as_slice().len()
    }

    fn visit(&self, f: &mut dyn FnMut(&Value) -> Result<()>) -> Result<()> {
        self.iter().try_for_each(|v| f(v))
    }

    fn append(&mut self, value: Value) -> Result<()> {
        self.push(value);
        Ok(())
    }
}

impl Sequence for VecDeque<Value> {
    fn len(&self) -> usize {
        VecDeque::len(self)
    }

    fn visit(&self, f: &mut dyn FnMut(&Value) -> Result<()>) -> Result<()> {
        self.iter().try_for_each(|v| f(v))
    }

    fn append(&mut self, value: Value) -> Result<()> {
        self.push_back(value);
        Ok(())
    }
}

impl Sequence for LinkedList<Value> {
    fn len(&self) -> usize {
        LinkedList::len(self)
    }

    fn visit(&self, f: &mut dyn FnMut(&Value) -> Result<()>) -> Result<()> {
        self.iter().try_for_each(|v| f(v))
    }

    fn append(&mut self, value: Value) -> Result<()> {
        self.push_back(value);
        Ok(())
    }
}

/// Capacity-bounded sequence whose live element count travels with it:
/// the fixed-size embedded array with a sibling length field.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedArray {
    items: Vec<Value>,
    capacity: usize,
}

impl FixedArray {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn max_len(&self) -> usize {
        self.capacity
    }

    pub fn as_slice(&self) -> &[Value] {
        &self.items
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.items.get(index)
    }

    pub fn into_vec(self) -> Vec<Value> {
        self.items
    }
}

impl Sequence for FixedArray {
    fn len(&self) -> usize {
        self.items.len()
    }

    fn capacity(&self) -> Option<usize> {
        Some(self.capacity)
    }

    fn visit(&self, f: &mut dyn FnMut(&Value) -> Result<()>) -> Result<()> {
        self.items.iter().try_for_each(|v| f(v))
    }

    fn append(&mut self, value: Value) -> Result<()> {
        if self.items.len() == self.capacity {
            return Err(append_rejected());
        }
        self.items.push(value);
        Ok(())
    }
}

impl Dictionary for HashMap<MapKey, Value> {
    fn len(&self) -> usize {
        HashMap::len(self)
    }

    fn visit_pairs(&self, f: &mut dyn FnMut(&MapKey, &Value) -> Result<()>) -> Result<()> {
        self.iter().try_for_each(|(k, v)| f(k, v))
    }

    fn insert_pair(&mut self, key: MapKey, value: Value) -> Result<()> {
        match self.entry(key) {
            std::collections::hash_map::Entry::Occupied(_) => Err(append_rejected()),
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(value);
                Ok(())
            }
        }
    }
}

impl Dictionary for BTreeMap<MapKey, Value> {
    fn len(&self) -> usize {
        BTreeMap::len(self)
    }

    fn visit_pairs(&self, f: &mut dyn FnMut(&MapKey, &Value) -> Result<()>) -> Result<()> {
        self.iter().try_for_each(|(k, v)| f(k, v))
    }

    fn insert_pair(&mut self, key: MapKey, value: Value) -> Result<()> {
        match self.entry(key) {
            std::collections::btree_map::Entry::Occupied(_) => Err(append_rejected()),
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(value);
                Ok(())
            }
        }
    }
}

/// Insertion-ordered pair list; duplicate detection is a linear scan.
impl Dictionary for Vec<(MapKey, Value)> {
    fn len(&self) -> usize {
        self.as_slice().len()
    }

    fn visit_pairs(&self, f: &mut dyn FnMut(&MapKey, &Value) -> Result<()>) -> Result<()> {
        self.iter().try_for_each(|(k, v)| f(k, v))
    }

    fn insert_pair(&mut self, key: MapKey, value: Value) -> Result<()> {
        if self.iter().any(|(existing, _)| *existing == key) {
            return Err(append_rejected());
        }
        self.push((key, value));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use {super::*, crate::error::Error};

    #[test]
    fn fixed_array_rejects_past_capacity() {
        let mut ar = FixedArray::new(2);
        ar.append(Value::I32(1)).unwrap();
        ar.append(Value::I32(2)).unwrap();
        assert_eq!(ar.append(Value::I32(3)), Err(Error::AppendRejected));
        assert_eq!(ar.len(), 2);
        assert_eq!(ar.capacity(), Some(2));
        assert_eq!(ar.get(1), Some(&Value::I32(2)));
    }

    #[test]
    fn dictionaries_reject_duplicate_keys() {
        let mut map: HashMap<MapKey, Value> = HashMap::new();
        map.insert_pair(MapKey::Int(1), Value::Bool(true)).unwrap();
        assert_eq!(
            map.insert_pair(MapKey::Int(1), Value::Bool(false)),
            Err(Error::AppendRejected)
        );
        assert_eq!(map.get(&MapKey::Int(1)), Some(&Value::Bool(true)));

        let mut pairs: Vec<(MapKey, Value)> = Vec::new();
        pairs.insert_pair(MapKey::Str("a".into()), Value::U8(1)).unwrap();
        assert_eq!(
            pairs.insert_pair(MapKey::Str("a".into()), Value::U8(2)),
            Err(Error::AppendRejected)
        );
    }

    #[test]
    fn visit_stops_at_first_error() {
        let seq: Vec<Value> = vec![Value::I32(1), Value::I32(2), Value::I32(3)];
        let mut seen = 0;
        let res = seq.visit(&mut |_| {
            seen += 1;
            if seen == 2 {
                Err(Error::AppendRejected)
            } else {
                Ok(())
            }
        });
        assert_eq!(res, Err(Error::AppendRejected));
        assert_eq!(seen, 2);
    }

    #[test]
    fn pair_list_preserves_insertion_order() {
        let mut pairs: Vec<(MapKey, Value)> = Vec::new();
        pairs.insert_pair(MapKey::Int(3), Value::U8(0)).unwrap();
        pairs.insert_pair(MapKey::Int(1), Value::U8(1)).unwrap();
        let mut keys = Vec::new();
        pairs
            .visit_pairs(&mut |k, _| {
                keys.push(k.clone());
                Ok(())
            })
            .unwrap();
        assert_eq!(keys, [MapKey::Int(3), MapKey::Int(1)]);
    }
}
