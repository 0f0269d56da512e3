use crate::net::{Ecn, Frame, NodeId};
use crate::queue::{
    ClassScheduler, DEFAULT_FRAME_BYTES, DropTailQueue, EcnConfig, EcnConfigError, EcnMarker,
    EnqueueOutcome, FrameQueue, RoundRobin,
    SchedulingPolicy, StrictPriority, TrafficControlPipeline, WeightedRoundRobin,
    mem_from_frames,
};

fn frame(id: u64, size_bytes: u32, priority: u8) -> Frame {
    Frame::new(id, 0, size_bytes, priority, vec![NodeId(0), NodeId(1)])
}

#[test]
fn droptail_queue_enforces_capacity_and_preserves_order() {
    let mut q = DropTailQueue::new(100);
    assert_eq!(q.capacity_bytes(), 100);
    assert!(q.is_empty());
    assert_eq!(q.bytes(), 0);

    assert!(q.enqueue(frame(1, 60, 0)).is_ok());
    assert_eq!(q.len(), 1);
    assert_eq!(q.bytes(), 60);

    let dropped = q.enqueue(frame(2, 50, 0)).expect_err("should drop");
    assert_eq!(dropped.id, 2);
    assert_eq!(q.len(), 1);
    assert_eq!(q.bytes(), 60);

    assert_eq!(q.dequeue().expect("frame").id, 1);
    assert_eq!(q.len(), 0);
    assert_eq!(q.bytes(), 0);
    assert!(q.dequeue().is_none());
}

#[test]
fn droptail_queue_zero_sized_frames_do_not_consume_capacity() {
    let mut q = DropTailQueue::new(10);
    assert!(q.enqueue(frame(1, 0, 0)).is_ok());
    assert!(q.enqueue(frame(2, 0, 0)).is_ok());
    assert_eq!(q.len(), 2);
    assert_eq!(q.bytes(), 0);
    assert_eq!(q.dequeue().expect("frame").id, 1);
    assert_eq!(q.dequeue().expect("frame").id, 2);
    assert!(q.dequeue().is_none());
}

#[test]
fn mem_from_frames_uses_default_frame_size() {
    assert_eq!(mem_from_frames(0), 0);
    assert_eq!(mem_from_frames(3), 3 * DEFAULT_FRAME_BYTES);
    assert_eq!(mem_from_frames(u64::MAX), u64::MAX);
}

#[test]
fn strict_priority_serves_highest_class_first() {
    let mut sp = StrictPriority::new(None);
    let mut eligible = [false; 8];
    assert_eq!(sp.pick(&eligible), None);

    eligible[1] = true;
    eligible[6] = true;
    for _ in 0..100 {
        assert_eq!(sp.pick(&eligible), Some(6));
    }
    eligible[6] = false;
    assert_eq!(sp.pick(&eligible), Some(1));
}

#[test]
fn strict_priority_starvation_limit_rotates_through_waiting_classes() {
    let mut sp = StrictPriority::new(Some(2));
    let mut eligible = [false; 8];
    eligible[0] = true;
    eligible[2] = true;
    eligible[7] = true;

    let picks: Vec<usize> = (0..9).filter_map(|_| sp.pick(&eligible)).collect();
    assert_eq!(picks, vec![7, 7, 0, 7, 7, 2, 7, 7, 0]);
}

#[test]
fn round_robin_cycles_eligible_classes_from_the_top() {
    let mut rr = RoundRobin::default();
    let mut eligible = [false; 8];
    eligible[1] = true;
    eligible[4] = true;
    eligible[6] = true;

    let picks: Vec<usize> = (0..6).filter_map(|_| rr.pick(&eligible)).collect();
    assert_eq!(picks, vec![6, 4, 1, 6, 4, 1]);

    eligible[4] = false;
    assert_eq!(rr.pick(&eligible), Some(6));
    assert_eq!(rr.pick(&eligible), Some(1));
}

#[test]
fn weighted_round_robin_grants_frames_per_weight() {
    let mut weights = vec![1; 8];
    weights[7] = 3;
    let mut wrr = WeightedRoundRobin::new(weights);
    let mut eligible = [false; 8];
    eligible[6] = true;
    eligible[7] = true;

    let picks: Vec<usize> = (0..8).filter_map(|_| wrr.pick(&eligible)).collect();
    assert_eq!(picks, vec![7, 7, 7, 6, 7, 7, 7, 6]);
}

#[test]
fn weighted_round_robin_treats_missing_and_zero_weights_as_one() {
    let mut wrr = WeightedRoundRobin::new(vec![0]);
    let mut eligible = [false; 8];
    eligible[0] = true;
    eligible[5] = true;

    let picks: Vec<usize> = (0..4).filter_map(|_| wrr.pick(&eligible)).collect();
    assert_eq!(picks, vec![5, 0, 5, 0]);
}

#[test]
fn scheduling_policy_deserializes_tagged_variants() {
    let sp: SchedulingPolicy = serde_json::from_str(r#"{ "kind": "strict_priority" }"#)
        .expect("parse strict priority");
    assert_eq!(sp, SchedulingPolicy::default());

    let unlimited: SchedulingPolicy =
        serde_json::from_str(r#"{ "kind": "strict_priority", "starvation_limit": null }"#)
            .expect("parse unlimited strict priority");
    assert_eq!(
        unlimited,
        SchedulingPolicy::StrictPriority {
            starvation_limit: None
        }
    );

    let wrr: SchedulingPolicy =
        serde_json::from_str(r#"{ "kind": "weighted_round_robin", "weights": [1, 2] }"#)
            .expect("parse wrr");
    assert_eq!(
        wrr,
        SchedulingPolicy::WeightedRoundRobin {
            weights: vec![1, 2]
        }
    );

    let rr: SchedulingPolicy =
        serde_json::from_str(r#"{ "kind": "round_robin" }"#).expect("parse rr");
    assert_eq!(rr, SchedulingPolicy::RoundRobin);
}

#[test]
fn pipeline_is_fifo_within_a_class() {
    let mut p = TrafficControlPipeline::unbounded(&SchedulingPolicy::default());
    for id in 0..5 {
        assert_eq!(p.enqueue(frame(id, 100, 3)), EnqueueOutcome::Accepted);
    }
    assert_eq!(p.len(), 5);
    assert_eq!(p.class_len(3), 5);
    assert_eq!(p.bytes(), 500);

    let order: Vec<u64> = std::iter::from_fn(|| p.try_dequeue()).map(|f| f.id).collect();
    assert_eq!(order, vec![0, 1, 2, 3, 4]);
    assert!(p.is_empty());
}

#[test]
fn paused_class_holds_frames_while_other_classes_flow() {
    let mut p = TrafficControlPipeline::unbounded(&SchedulingPolicy::default());
    p.enqueue(frame(1, 100, 5));
    p.enqueue(frame(2, 100, 1));
    p.set_paused(5, true);
    assert!(p.is_paused(5));

    assert_eq!(p.try_dequeue().expect("class 1 flows").id, 2);
    assert_eq!(p.try_dequeue(), None);
    assert!(!p.has_eligible());
    assert_eq!(p.class_len(5), 1, "paused frame is held, not dropped");

    p.set_paused(5, false);
    assert!(p.has_eligible());
    assert_eq!(p.try_dequeue().expect("class 5 resumes").id, 1);
}

#[test]
fn bounded_pipeline_drops_when_class_is_full() {
    let mut p = TrafficControlPipeline::new(200, &SchedulingPolicy::RoundRobin);
    assert!(p.enqueue(frame(1, 150, 0)).is_accepted());
    assert_eq!(
        p.enqueue(frame(2, 100, 0)),
        EnqueueOutcome::Dropped(frame(2, 100, 0))
    );
    // 容量按优先级独立计算
    assert!(p.enqueue(frame(3, 150, 1)).is_accepted());
    assert_eq!(p.len(), 2);
}

fn ecn(k_min_bytes: u64, k_max_bytes: u64, p_max: f64) -> EcnConfig {
    EcnConfig {
        k_min_bytes,
        k_max_bytes,
        p_max,
    }
}

#[test]
fn ecn_helpers_match_expected_states() {
    assert!(!Ecn::NotEct.is_ect());
    assert!(Ecn::Ect0.is_ect());
    assert!(!Ecn::Ce.is_ect());
    assert!(Ecn::Ce.is_ce());

    let mut f = frame(1, 100, 0);
    f.mark_ce_if_ect();
    assert_eq!(f.ecn, Ecn::NotEct);
    let mut f = f.with_ecn(Ecn::Ect0);
    f.mark_ce_if_ect();
    assert_eq!(f.ecn, Ecn::Ce);
}

#[test]
fn ecn_config_validation() {
    assert_eq!(ecn(1_000, 2_000, 0.5).validate(), Ok(()));
    assert_eq!(
        ecn(1_000, 1_000, 1.0).validate(),
        Err(EcnConfigError::InvertedThresholds {
            k_min: 1_000,
            k_max: 1_000
        })
    );
    assert_eq!(
        ecn(0, 1_000, 1.5).validate(),
        Err(EcnConfigError::ProbabilityOutOfRange)
    );
    assert_eq!(
        ecn(0, 1_000, f64::NAN).validate(),
        Err(EcnConfigError::ProbabilityOutOfRange)
    );
}

#[test]
fn ecn_probability_is_linear_between_thresholds() {
    let cfg = ecn(1_000, 3_000, 0.4);
    assert_eq!(cfg.mark_probability(0), 0.0);
    assert_eq!(cfg.mark_probability(1_000), 0.0);
    assert!((cfg.mark_probability(2_000) - 0.2).abs() < 1e-12);
    assert_eq!(cfg.mark_probability(3_000), 1.0);
    assert_eq!(cfg.mark_probability(u64::MAX), 1.0);
}

#[test]
fn pipeline_marks_ect_frames_once_backlog_reaches_k_max() {
    let policy = SchedulingPolicy::default();
    let mut p = TrafficControlPipeline::unbounded(&policy);
    // p_max 为 0：区间内从不标记，只有达到 k_max 才标记
    p.set_ecn(2, EcnMarker::new(ecn(3_000, 6_000, 0.0), 7));

    for id in 1..=5 {
        let f = frame(id, 1_500, 2).with_ecn(Ecn::Ect0);
        assert_eq!(p.enqueue(f), EnqueueOutcome::Accepted);
    }
    // 其他优先级未配置
    assert_eq!(
        p.enqueue(frame(6, 1_500, 1).with_ecn(Ecn::Ect0)),
        EnqueueOutcome::Accepted
    );
    assert_eq!(p.ecn_marked(), 2);

    let mut marks = Vec::new();
    while let Some(f) = p.try_dequeue() {
        marks.push((f.id, f.ecn));
    }
    assert_eq!(
        marks,
        vec![
            (1, Ecn::Ect0),
            (2, Ecn::Ect0),
            (3, Ecn::Ect0),
            (4, Ecn::Ce),
            (5, Ecn::Ce),
            (6, Ecn::Ect0),
        ]
    );
}

#[test]
fn pipeline_never_marks_not_ect_frames() {
    let policy = SchedulingPolicy::default();
    let mut p = TrafficControlPipeline::unbounded(&policy);
    p.set_ecn(0, EcnMarker::new(ecn(0, 1, 1.0), 0));
    for id in 1..=4 {
        p.enqueue(frame(id, 1_500, 0));
    }
    assert_eq!(p.ecn_marked(), 0);
    while let Some(f) = p.try_dequeue() {
        assert_eq!(f.ecn, Ecn::NotEct);
    }
}

#[test]
fn pipeline_does_not_count_marks_on_rejected_frames() {
    let policy = SchedulingPolicy::default();
    let mut p = TrafficControlPipeline::new(2_000, &policy);
    p.set_ecn(0, EcnMarker::new(ecn(0, 1_000, 1.0), 0));
    assert!(p.enqueue(frame(1, 1_500, 0).with_ecn(Ecn::Ect0)).is_accepted());
    assert!(!p.enqueue(frame(2, 1_500, 0).with_ecn(Ecn::Ect0)).is_accepted());
    assert_eq!(p.ecn_marked(), 1);
}

#[test]
fn ecn_marker_draws_are_reproducible_per_salt() {
    let cfg = ecn(1_000, 3_000, 0.5);
    let decisions = |salt| {
        let mut m = EcnMarker::new(cfg, salt);
        (0..10_000).map(|_| m.should_mark(2_000)).collect::<Vec<_>>()
    };
    let a = decisions(42);
    assert_eq!(a, decisions(42));
    assert_ne!(a, decisions(43));

    // 区间中点的标记概率为 p_max / 2
    let marked = a.iter().filter(|&&m| m).count();
    assert!((2_200..=2_800).contains(&marked), "marked {marked} of 10000");
}
