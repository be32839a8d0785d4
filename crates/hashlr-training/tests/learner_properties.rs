//! End-to-end properties of the online learner and the predictor.

use hashlr_core::{
    Event, EventContext, FeatureLayout, FeatureVectorBuilder, Label, LearnerConfig, TaggedTokens,
};
use hashlr_optimizer::logistic::sigmoid;
use hashlr_optimizer::EagerSgd;
use hashlr_training::{predict, spawn_prefetch, train, OnlineLearner, Predictor};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn tokens(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn random_events(rng: &mut StdRng, n: usize) -> Vec<Event> {
    (0..n)
        .map(|_| {
            let context = EventContext::new(
                rng.gen_range(1..4),
                rng.gen_range(1..4),
                rng.gen_range(0..6),
                rng.gen_range(-1..=1),
                rng.gen_range(0..20),
            );
            let words: Vec<String> = (0..rng.gen_range(0..5))
                .map(|_| rng.gen_range(0..200).to_string())
                .collect();
            if rng.gen_bool(0.5) {
                Event::binary(context, rng.gen_bool(0.3), words)
            } else {
                let impressions = rng.gen_range(0..6);
                let clicks = rng.gen_range(0..=impressions);
                Event::aggregated(
                    context,
                    clicks,
                    impressions,
                    TaggedTokens {
                        query: words.clone(),
                        keyword: words[..words.len() / 2].to_vec(),
                        ..Default::default()
                    },
                )
            }
        })
        .collect()
}

#[test]
fn scenario_single_click_raises_prediction() {
    for layout in [FeatureLayout::Structured, FeatureLayout::FullyHashed] {
        let config = LearnerConfig::builder()
            .dim(8)
            .step(0.1)
            .lambda(0.01)
            .personalized(false)
            .layout(layout)
            .build()
            .unwrap();
        let event = Event::binary(EventContext::default(), true, tokens(&["a"]));
        let predictor = Predictor::new(&config).unwrap();

        let mut learner = OnlineLearner::new(config).unwrap();
        assert_eq!(predictor.predict(learner.weights(), &event).unwrap(), 0.5);

        learner.update(&event).unwrap();
        let weights = learner.finish().unwrap();
        assert!(predictor.predict(&weights, &event).unwrap() > 0.5);
    }
}

#[test]
fn gradient_sign_moves_margin() {
    let config = LearnerConfig::builder()
        .dim(8)
        .step(0.05)
        .lambda(0.01)
        .layout(FeatureLayout::Structured)
        .build()
        .unwrap();
    let builder = FeatureVectorBuilder::from_config(&config).unwrap();

    for clicked in [true, false] {
        let event = Event::binary(EventContext::new(1, 2, 1, 1, 0), clicked, vec![]);
        let features = builder.build(&event);
        assert!(features.hashed().is_empty());

        let mut learner = OnlineLearner::new(config.clone()).unwrap();
        learner.train(vec![event.clone(); 3]).unwrap();
        let before = learner.weights().dot(&features);
        learner.update(&event).unwrap();
        let after = learner.weights().dot(&features);
        if clicked {
            assert!(after > before, "clicked: {} -> {}", before, after);
        } else {
            assert!(after < before, "not clicked: {} -> {}", before, after);
        }
    }
}

#[test]
fn aggregated_gradient_scales_with_impressions() {
    let config = LearnerConfig::builder().dim(97).step(0.01).build().unwrap();
    let context = EventContext::new(1, 1, 2, 1, 0);
    let text = TaggedTokens {
        query: tokens(&["5", "6"]),
        title: tokens(&["7"]),
        ..Default::default()
    };
    let small = Event::aggregated(context, 1, 1, text.clone());
    let large = Event::aggregated(context, 10, 10, text);

    let mut a = OnlineLearner::new(config.clone()).unwrap();
    let mut b = OnlineLearner::new(config).unwrap();
    let ra = a.update(&small).unwrap();
    let rb = b.update(&large).unwrap();

    assert!((rb.gradient - 10.0 * ra.gradient).abs() < 1e-12);
    assert!(b.weights().bias().abs() > a.weights().bias().abs());
    assert!((b.weights().bias() - 10.0 * a.weights().bias()).abs() < 1e-12);
}

#[test]
fn zero_impressions_is_a_no_op_without_regularization() {
    let config = LearnerConfig::builder().dim(97).step(0.1).build().unwrap();
    let mut learner = OnlineLearner::new(config).unwrap();
    let event = Event::aggregated(
        EventContext::new(1, 1, 1, 1, 3),
        0,
        0,
        TaggedTokens {
            query: tokens(&["1"]),
            ..Default::default()
        },
    );
    let report = learner.update(&event).unwrap();
    assert_eq!(report.gradient, 0.0);
    assert!(learner.weights().hashed().iter().all(|&w| w == 0.0));
    assert_eq!(learner.weights().bias(), 0.0);
}

#[test]
fn clicks_above_impressions_rejected() {
    let config = LearnerConfig::builder().dim(97).build().unwrap();
    let mut learner = OnlineLearner::new(config).unwrap();
    let event = Event::binary(EventContext::default(), true, vec![]).with_label(Label::Counts {
        clicks: 3,
        impressions: 1,
    });
    assert!(learner.update(&event).is_err());
    assert_eq!(learner.global_step(), 0);
}

#[test]
fn zero_lambda_equals_plain_sgd() {
    let mut rng = StdRng::seed_from_u64(5);
    let events = random_events(&mut rng, 300);
    let config = LearnerConfig::builder()
        .dim(61)
        .step(0.02)
        .lambda(0.0)
        .layout(FeatureLayout::Structured)
        .build()
        .unwrap();
    let builder = FeatureVectorBuilder::from_config(&config).unwrap();

    let mut bias = 0.0f64;
    let mut dense = [0.0f64; 4];
    let mut hashed = vec![0.0f64; 61];
    for event in &events {
        let features = builder.build(event);
        let values: Vec<f64> = features.dense().unwrap().iter().map(|(_, x)| x).collect();
        let wx = bias
            + dense.iter().zip(&values).map(|(w, x)| w * x).sum::<f64>()
            + features
                .hashed()
                .iter()
                .map(|(i, v)| hashed[i] * v as f64)
                .sum::<f64>();
        let (clicks, impressions) = event.label.counts().unwrap();
        let g = hashlr_optimizer::logistic::gradient(clicks, impressions, wx);
        bias -= 0.02 * g;
        for (w, x) in dense.iter_mut().zip(&values) {
            *w -= 0.02 * (g * x);
        }
        for (i, v) in features.hashed().iter() {
            hashed[i] -= 0.02 * (g * v as f64);
        }
    }

    let weights = train(events, config).unwrap();
    assert!((weights.bias() - bias).abs() < 1e-12);
    for ((_, a), b) in weights.dense().unwrap().iter().zip(dense) {
        assert!((a - b).abs() < 1e-12);
    }
    for (a, b) in weights.hashed().iter().zip(&hashed) {
        assert!((a - b).abs() < 1e-12);
    }
}

#[test]
fn lazy_matches_eager_at_every_step() {
    let mut rng = StdRng::seed_from_u64(11);
    let events = random_events(&mut rng, 400);
    for personalized in [false, true] {
        let config = LearnerConfig::builder()
            .dim(97)
            .step(0.01)
            .lambda(0.3)
            .personalized(personalized)
            .build()
            .unwrap();
        let mut lazy = OnlineLearner::new(config.clone()).unwrap();
        let mut eager = OnlineLearner::<EagerSgd>::with_optimizer(config).unwrap();

        for event in &events {
            let a = lazy.update(event).unwrap();
            let b = eager.update(event).unwrap();
            assert!((a.margin - b.margin).abs() < 1e-9 * (1.0 + b.margin.abs()));

            let settled = lazy.weights().settled_hashed();
            for (x, y) in settled.iter().zip(eager.weights().hashed()) {
                assert!((x - y).abs() <= 1e-9 * (1.0 + y.abs()), "{} vs {}", x, y);
            }
        }

        let lazy = lazy.finish().unwrap();
        let eager = eager.finish().unwrap();
        for (x, y) in lazy.hashed().iter().zip(eager.hashed()) {
            assert!((x - y).abs() <= 1e-9 * (1.0 + y.abs()));
        }
        assert!((lazy.l2_norm() - eager.l2_norm()).abs() <= 1e-9 * (1.0 + eager.l2_norm()));
    }
}

#[test]
fn personalization_separates_users() {
    let base = LearnerConfig::builder().dim(12289).step(0.1);
    let likes = Event::binary(EventContext::new(1, 1, 2, 1, 1), true, tokens(&["9"]));
    let dislikes = Event::binary(EventContext::new(1, 1, 2, 1, 2), false, tokens(&["9"]));
    let stream: Vec<Event> = (0..20)
        .flat_map(|_| [likes.clone(), dislikes.clone()])
        .collect();

    let global = base.clone().personalized(false).build().unwrap();
    let weights = train(stream.clone(), global.clone()).unwrap();
    let predictor = Predictor::new(&global).unwrap();
    assert_eq!(
        predictor.predict(&weights, &likes).unwrap(),
        predictor.predict(&weights, &dislikes).unwrap()
    );

    let personal = base.personalized(true).build().unwrap();
    let weights = train(stream, personal.clone()).unwrap();
    let predictor = Predictor::new(&personal).unwrap();
    assert!(
        predictor.predict(&weights, &likes).unwrap()
            > predictor.predict(&weights, &dislikes).unwrap()
    );
}

#[test]
fn prefetched_training_matches_direct() {
    let mut rng = StdRng::seed_from_u64(3);
    let events = random_events(&mut rng, 200);
    let config = LearnerConfig::builder()
        .dim(97)
        .step(0.05)
        .lambda(0.1)
        .build()
        .unwrap();

    let direct = train(events.clone(), config.clone()).unwrap();

    let mut learner = OnlineLearner::new(config).unwrap();
    let applied = learner
        .train(spawn_prefetch(events.into_iter(), 16).unwrap())
        .unwrap();
    assert_eq!(applied, 200);
    assert_eq!(learner.finish().unwrap(), direct);
}

#[test]
fn predict_is_pure() {
    let mut rng = StdRng::seed_from_u64(8);
    let events = random_events(&mut rng, 50);
    let config = LearnerConfig::builder()
        .dim(97)
        .step(0.05)
        .lambda(0.2)
        .build()
        .unwrap();
    let mut learner = OnlineLearner::new(config.clone()).unwrap();
    learner.train(events.clone()).unwrap();

    // Scoring the unsettled store reads raw weights and changes nothing.
    let snapshot = learner.weights().clone();
    let builder = FeatureVectorBuilder::from_config(&config).unwrap();
    for event in &events {
        let features = builder.build(event);
        let p = predict(learner.weights(), &features).unwrap();
        assert_eq!(p, sigmoid(snapshot.dot(&features)));
    }
    assert_eq!(learner.weights(), &snapshot);
}
