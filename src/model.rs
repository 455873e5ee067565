//! Reference-model testing: drives an [`AvlTree`] and a [`BTreeMap`] with the same operations and
//! checks that they agree after every step.

use std::collections::BTreeMap;

use arbitrary::Arbitrary;
use proptest::strategy::{Just, Strategy};

use crate::AvlTree;

#[derive(Copy, Clone, Debug, Arbitrary)]
pub enum ItemValue {
    /// Picks an existing key by position, so that hits are common.
    Index(usize),
    Random(i64),
}

proptest::prop_compose! {
    fn index_strategy()(
        index in 0usize..1000,
    ) -> ItemValue {
        ItemValue::Index(index)
    }
}

proptest::prop_compose! {
    fn random_strategy()(
        random in -500i64..500,
    ) -> ItemValue {
        ItemValue::Random(random)
    }
}

fn item_strategy() -> impl Strategy<Value = ItemValue> {
    proptest::prop_oneof![index_strategy(), random_strategy()]
}

#[derive(Copy, Clone, Debug, Arbitrary)]
pub enum Op {
    Insert(ItemValue, u8),
    Get(ItemValue),
    Update(ItemValue, u8),
    Delete(ItemValue),
    First,
    PopFirst,
    Last,
    PopLast,
}

impl Op {
    fn finalize(self, sorted: &[i64]) -> FinalOp {
        fn get_key(v: &[i64], i: ItemValue) -> i64 {
            match i {
                ItemValue::Index(idx) => {
                    if v.is_empty() {
                        idx as i64
                    } else {
                        v[idx % v.len()]
                    }
                }
                ItemValue::Random(k) => k,
            }
        }

        fn value(tag: u8) -> String {
            format!("value-{tag}")
        }

        match self {
            Op::Insert(item, tag) => FinalOp::Insert(get_key(sorted, item), value(tag)),
            Op::Get(item) => FinalOp::Get(get_key(sorted, item)),
            Op::Update(item, tag) => FinalOp::Update(get_key(sorted, item), value(tag)),
            Op::Delete(item) => FinalOp::Delete(get_key(sorted, item)),
            Op::First => FinalOp::First,
            Op::PopFirst => FinalOp::PopFirst,
            Op::Last => FinalOp::Last,
            Op::PopLast => FinalOp::PopLast,
        }
    }
}

#[derive(Clone, Debug)]
enum FinalOp {
    Insert(i64, String),
    Get(i64),
    Update(i64, String),
    Delete(i64),
    First,
    PopFirst,
    Last,
    PopLast,
}

pub fn op_strategy() -> impl Strategy<Value = Op> {
    proptest::prop_oneof![
        (item_strategy(), proptest::num::u8::ANY).prop_map(|(i, t)| Op::Insert(i, t)),
        item_strategy().prop_map(Op::Get),
        (item_strategy(), proptest::num::u8::ANY).prop_map(|(i, t)| Op::Update(i, t)),
        item_strategy().prop_map(Op::Delete),
        Just(Op::First),
        Just(Op::PopFirst),
        Just(Op::Last),
        Just(Op::PopLast),
    ]
}

pub fn run_btree_equivalence(ops: Vec<Op>) {
    let mut sorted_keys = Vec::with_capacity(ops.len());
    let mut btree = BTreeMap::new();
    let mut avl = AvlTree::new();

    fn insert_sorted(v: &mut Vec<i64>, key: i64) {
        if let Err(idx) = v.binary_search(&key) {
            v.insert(idx, key);
        }
    }

    fn remove_sorted(v: &mut Vec<i64>, key: i64) {
        if let Ok(idx) = v.binary_search(&key) {
            v.remove(idx);
        }
    }

    fn borrowed<'a>((k, v): (&'a i64, &'a String)) -> (i64, &'a str) {
        (*k, v.as_str())
    }

    for (op_id, op) in ops.into_iter().enumerate() {
        let final_op = op.finalize(&sorted_keys);

        match final_op.clone() {
            FinalOp::Insert(key, value) => {
                insert_sorted(&mut sorted_keys, key);

                let from_btree = btree.insert(key, value.clone());
                let from_avl = avl.insert(key, value);

                assert_eq!(from_btree, from_avl, "Op #{op_id}: {final_op:?}");
            }

            FinalOp::Get(key) => {
                let from_btree = btree.get(&key).map(String::as_str);
                let from_avl = avl.get(key);

                assert_eq!(from_btree, from_avl, "Op #{op_id}: {final_op:?}");
            }

            FinalOp::Update(key, value) => {
                let from_btree = btree
                    .get_mut(&key)
                    .map(|slot| std::mem::replace(slot, value.clone()));
                let from_avl = avl.update(key, value);

                assert_eq!(from_btree, from_avl, "Op #{op_id}: {final_op:?}");
            }

            FinalOp::Delete(key) => {
                remove_sorted(&mut sorted_keys, key);

                let from_btree = btree.remove(&key);
                let from_avl = avl.delete(key);

                assert_eq!(from_btree, from_avl, "Op #{op_id}: {final_op:?}");
            }

            FinalOp::First => {
                let from_btree = btree.first_key_value().map(borrowed);
                let from_avl = avl.first();

                assert_eq!(from_btree, from_avl, "Op #{op_id}: {final_op:?}");
            }

            FinalOp::PopFirst => {
                let from_btree = btree.pop_first();
                let from_avl = avl.pop_first();

                if let Some((key, _)) = &from_btree {
                    remove_sorted(&mut sorted_keys, *key);
                }

                assert_eq!(from_btree, from_avl, "Op #{op_id}: {final_op:?}");
            }

            FinalOp::Last => {
                let from_btree = btree.last_key_value().map(borrowed);
                let from_avl = avl.last();

                assert_eq!(from_btree, from_avl, "Op #{op_id}: {final_op:?}");
            }

            FinalOp::PopLast => {
                let from_btree = btree.pop_last();
                let from_avl = avl.pop_last();

                if let Some((key, _)) = &from_btree {
                    remove_sorted(&mut sorted_keys, *key);
                }

                assert_eq!(from_btree, from_avl, "Op #{op_id}: {final_op:?}");
            }
        }

        avl.assert_invariants();
        assert_eq!(btree.len(), avl.len());
        assert!(btree.iter().map(borrowed).eq(avl.iter()));
    }
}
