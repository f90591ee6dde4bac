//! Property-based tests for the in-memory record store
//!
//! Runs random create/update/delete sequences against `MemoryStore` and a
//! plain vector model, and checks they agree after every step.
#![allow(clippy::unwrap_used)]

use proptest::prelude::*;

use jsonrest::store::{
    from_rec_id, to_rec_id, Endpoint, EndpointUpdate, MemoryStore, NewEndpoint, RecordStore,
};

// ============================================================================
// Test Strategies
// ============================================================================

#[derive(Debug, Clone)]
enum Op {
    Create(u8),
    Update(usize, u8),
    Destroy(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        any::<u8>().prop_map(Op::Create),
        (0usize..8, any::<u8>()).prop_map(|(i, n)| Op::Update(i, n)),
        (0usize..8).prop_map(Op::Destroy),
    ]
}

fn raw(n: u8) -> String {
    format!("[{}]", n)
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(future)
}

// ============================================================================
// Store Properties
// ============================================================================

proptest! {
    /// The store matches a vector model under any sequence of operations
    #[test]
    fn prop_store_matches_model(ops in prop::collection::vec(op_strategy(), 0..40)) {
        block_on(async {
            let store = MemoryStore::new().with_first_page_size(usize::MAX);
            let mut model: Vec<Endpoint> = Vec::new();

            for op in ops {
                match op {
                    Op::Create(n) => {
                        let created = store
                            .create(vec![NewEndpoint { id_prop_name: "id".into(), raw: raw(n) }])
                            .await
                            .unwrap();
                        model.extend(created);
                    }
                    Op::Update(i, n) if i < model.len() => {
                        let update = EndpointUpdate {
                            id: model[i].id.clone(),
                            raw: Some(raw(n)),
                            ..EndpointUpdate::default()
                        };
                        store.update(vec![update]).await.unwrap();
                        model[i].raw = raw(n);
                    }
                    Op::Destroy(i) if i < model.len() => {
                        let deleted = store.destroy(&model[i].id).await.unwrap();
                        prop_assert_eq!(deleted, model.remove(i));
                    }
                    Op::Update(_, _) | Op::Destroy(_) => {
                        prop_assert!(store.destroy("recmissing").await.is_err());
                    }
                }
                prop_assert_eq!(store.list_first_page().await.unwrap(), model.clone());
            }
            Ok(())
        })?;
    }

    /// Public ids convert back to the record ids the store assigned
    #[test]
    fn prop_rec_ids_round_trip(count in 1usize..10) {
        block_on(async {
            let store = MemoryStore::new();
            let records = (0..count)
                .map(|_| NewEndpoint { id_prop_name: "id".into(), raw: "[]".into() })
                .collect();
            for endpoint in store.create(records).await.unwrap() {
                let public = from_rec_id(&endpoint.id);
                prop_assert_ne!(public, endpoint.id.as_str());
                prop_assert_eq!(to_rec_id(public), endpoint.id.clone());
            }
            Ok(())
        })?;
    }
}
