//! Randomized create / update / delete sequences against the real ledger.
//!
//! After every sequence each `item.qty` must equal its opening stock plus
//! the signed quantities of the lines that are still live.

use std::collections::HashMap;

use chrono::NaiveDate;
use proptest::prelude::*;
use tally_core::{Item, LineInput, NewItem, NewPurchase, NewSale};
use tally_db::{Database, DbConfig};

const ITEMS: usize = 3;
const OPENING: i64 = 1_000;

#[derive(Debug, Clone)]
enum Op {
    Create {
        sale: bool,
        lines: Vec<(usize, i64)>,
    },
    Update {
        pick: usize,
        keep: u8,
        qty: i64,
        swap_item: bool,
        add: Option<(usize, i64)>,
    },
    Delete {
        pick: usize,
    },
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (
            any::<bool>(),
            prop::collection::vec((0..ITEMS, 1..40i64), 1..4)
        )
            .prop_map(|(sale, lines)| Op::Create { sale, lines }),
        (
            any::<usize>(),
            any::<u8>(),
            1..40i64,
            any::<bool>(),
            prop::option::of((0..ITEMS, 1..40i64))
        )
            .prop_map(|(pick, keep, qty, swap_item, add)| Op::Update {
                pick,
                keep,
                qty,
                swap_item,
                add
            }),
        any::<usize>().prop_map(|pick| Op::Delete { pick }),
    ]
}

/// A live document as the test believes it is stored.
struct Doc {
    id: String,
    sale: bool,
    lines: Vec<(usize, i64)>,
}

async fn seed_items(db: &Database) -> Vec<Item> {
    let mut items = Vec::with_capacity(ITEMS);
    for i in 0..ITEMS {
        let item = db
            .items()
            .create(NewItem {
                code: format!("IT-{i}"),
                name: format!("Item {i}"),
                price_cents: 100,
                qty: OPENING,
                rop: 0,
            })
            .await
            .unwrap();
        items.push(item);
    }
    items
}

async fn create(db: &Database, items: &[Item], sale: bool, lines: &[(usize, i64)]) -> String {
    let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
    let inputs: Vec<LineInput> = lines
        .iter()
        .map(|(item, qty)| LineInput::new(&items[*item].id, *qty, 250))
        .collect();

    if sale {
        db.sales()
            .create(NewSale {
                customer: None,
                date,
                description: None,
                lines: inputs,
            })
            .await
            .unwrap()
            .id
    } else {
        db.purchases()
            .create(NewPurchase {
                supplier: "Acme".to_string(),
                date,
                description: None,
                lines: inputs,
            })
            .await
            .unwrap()
            .id
    }
}

async fn run(ops: Vec<Op>) -> Result<(), TestCaseError> {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let items = seed_items(&db).await;
    let mut live: Vec<Doc> = Vec::new();

    for op in ops {
        match op {
            Op::Create { sale, lines } => {
                let id = create(&db, &items, sale, &lines).await;
                live.push(Doc { id, sale, lines });
            }
            Op::Update {
                pick,
                keep,
                qty,
                swap_item,
                add,
            } if !live.is_empty() => {
                let idx = pick % live.len();
                let doc = &mut live[idx];
                let stored = if doc.sale {
                    db.sales().lines(&doc.id).await.unwrap()
                } else {
                    db.purchases().lines(&doc.id).await.unwrap()
                };
                let item_index = |item_id: &str| {
                    items.iter().position(|i| i.id == item_id).unwrap()
                };

                let mut inputs = Vec::new();
                let mut model = Vec::new();
                for (n, line) in stored.iter().enumerate() {
                    if (keep >> (n % 8)) & 1 == 0 {
                        continue;
                    }
                    let mut item = item_index(&line.item_id);
                    let mut line_qty = line.qty;
                    if inputs.is_empty() {
                        line_qty = qty;
                        if swap_item {
                            item = (item + 1) % ITEMS;
                        }
                    }
                    let mut input = LineInput::new(&items[item].id, line_qty, line.unit_price_cents);
                    input.id = Some(line.id.clone());
                    inputs.push(input);
                    model.push((item, line_qty));
                }
                if let Some((item, add_qty)) = add {
                    inputs.push(LineInput::new(&items[item].id, add_qty, 300));
                    model.push((item, add_qty));
                }
                if inputs.is_empty() {
                    continue;
                }

                if doc.sale {
                    db.sales().update_lines(&doc.id, inputs).await.unwrap();
                } else {
                    db.purchases().update_lines(&doc.id, inputs).await.unwrap();
                }
                doc.lines = model;
            }
            Op::Delete { pick } if !live.is_empty() => {
                let doc = live.remove(pick % live.len());
                if doc.sale {
                    db.sales().delete(&doc.id).await.unwrap();
                } else {
                    db.purchases().delete(&doc.id).await.unwrap();
                }
            }
            _ => {}
        }
    }

    let mut expected: HashMap<usize, i64> = (0..ITEMS).map(|i| (i, OPENING)).collect();
    for doc in &live {
        let direction = if doc.sale { -1 } else { 1 };
        for (item, qty) in &doc.lines {
            *expected.get_mut(item).unwrap() += direction * qty;
        }
    }

    for (i, item) in items.iter().enumerate() {
        let stored = db.items().get(&item.id).await.unwrap().unwrap();
        prop_assert_eq!(stored.qty, expected[&i], "item {}", i);
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn ledger_matches_live_lines(ops in prop::collection::vec(op(), 1..25)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(run(ops))?;
    }
}
