//! Lazy regularization must reproduce eager regularization.

use hashlr_core::{
    Event, EventContext, FeatureLayout, FeatureVectorBuilder, Label, LearnerConfig, TaggedTokens,
};
use hashlr_optimizer::{EagerSgd, LazySgd, Optimizer, WeightStore};
use proptest::prelude::*;

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * (1.0 + a.abs().max(b.abs()))
}

fn arb_event() -> impl Strategy<Value = Event> {
    let tokens = prop::collection::vec(0u8..24, 0..4);
    (
        (0i32..3, 0i32..3, 0i32..4, -1i32..=1, 0u32..4),
        prop_oneof![
            any::<bool>().prop_map(Label::Clicked),
            (0u32..5, 0u32..5).prop_map(|(a, b)| Label::Counts {
                clicks: a.min(b),
                impressions: a.max(b),
            }),
        ],
        tokens.clone(),
        tokens,
    )
        .prop_map(|((depth, position, age, gender, user), label, a, b)| {
            let context = EventContext::new(depth, position, age, gender, user);
            let text = |v: Vec<u8>| v.into_iter().map(|t| t.to_string()).collect::<Vec<_>>();
            match label {
                Label::Counts { .. } => Event::aggregated(
                    context,
                    0,
                    0,
                    TaggedTokens {
                        query: text(a),
                        title: text(b),
                        ..Default::default()
                    },
                )
                .with_label(label),
                _ => Event::binary(context, false, text(a)).with_label(label),
            }
        })
}

fn run<O: Optimizer>(config: &LearnerConfig, events: &[Event]) -> WeightStore {
    let builder = FeatureVectorBuilder::from_config(config).unwrap();
    let mut store = WeightStore::new(config);
    let mut optimizer = O::new(config.clone()).unwrap();
    for event in events {
        optimizer
            .step(&mut store, &builder.build(event), &event.label)
            .unwrap();
    }
    optimizer.settle(&mut store);
    store
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_lazy_matches_eager(
        dim in 4usize..40,
        step in 0.001f64..0.02,
        lambda in 0.0f64..2.0,
        personalized in any::<bool>(),
        structured in any::<bool>(),
        events in prop::collection::vec(arb_event(), 0..60),
    ) {
        let layout = if structured { FeatureLayout::Structured } else { FeatureLayout::FullyHashed };
        let config = LearnerConfig::builder()
            .dim(dim)
            .step(step)
            .lambda(lambda)
            .personalized(personalized)
            .layout(layout)
            .build()
            .unwrap();

        let lazy = run::<LazySgd>(&config, &events);
        let eager = run::<EagerSgd>(&config, &events);

        prop_assert!(lazy.is_settled());
        prop_assert!(close(lazy.bias(), eager.bias()));
        if let (Some(a), Some(b)) = (lazy.dense(), eager.dense()) {
            for ((_, x), (_, y)) in a.iter().zip(b.iter()) {
                prop_assert!(close(x, y), "dense {} vs {}", x, y);
            }
        }
        for (i, (x, y)) in lazy.hashed().iter().zip(eager.hashed()).enumerate() {
            prop_assert!(close(*x, *y), "index {}: lazy {} vs eager {}", i, x, y);
        }
        prop_assert!(close(lazy.l2_norm(), eager.l2_norm()));
    }

    #[test]
    fn prop_settled_weight_predicts_sweep(
        lambda in 0.0f64..2.0,
        events in prop::collection::vec(arb_event(), 1..40),
    ) {
        let config = LearnerConfig::builder().dim(16).step(0.1).lambda(lambda).build().unwrap();
        let builder = FeatureVectorBuilder::from_config(&config).unwrap();
        let mut store = WeightStore::new(&config);
        let mut sgd = LazySgd::new(config).unwrap();
        for event in &events {
            sgd.step(&mut store, &builder.build(event), &event.label).unwrap();
        }
        let predicted = store.settled_hashed();
        let norm = store.l2_norm();
        sgd.settle(&mut store);
        for (x, y) in predicted.iter().zip(store.hashed()) {
            prop_assert!(close(*x, *y));
        }
        prop_assert!(close(norm, store.l2_norm()));
    }

    #[test]
    fn prop_zero_lambda_leaves_unreferenced_weights(
        events in prop::collection::vec(arb_event(), 1..40),
    ) {
        let config = LearnerConfig::builder().dim(64).step(0.05).build().unwrap();
        let builder = FeatureVectorBuilder::from_config(&config).unwrap();
        let mut store = WeightStore::new(&config);
        let mut sgd = LazySgd::new(config).unwrap();
        for event in &events {
            let features = builder.build(event);
            let before = store.hashed().to_vec();
            sgd.step(&mut store, &features, &event.label).unwrap();
            for (i, (a, b)) in before.iter().zip(store.hashed()).enumerate() {
                if features.hashed().get(i).is_none() {
                    prop_assert_eq!(a, b);
                }
            }
        }
        let raw = store.hashed().to_vec();
        sgd.settle(&mut store);
        prop_assert_eq!(raw.as_slice(), store.hashed());
    }

    #[test]
    fn prop_gradient_sign_moves_margin(
        wx in -20.0f64..20.0,
        clicked in any::<bool>(),
    ) {
        let g = hashlr_optimizer::logistic::gradient(u32::from(clicked), 1, wx);
        if clicked {
            prop_assert!(g < 0.0);
        } else {
            prop_assert!(g > 0.0);
        }
    }
}
