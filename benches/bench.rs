// Criterion benchmarks for candidate selection

use chatogram_engine::core::{choose_partner, Candidate, SelectionPolicy};
use chatogram_engine::models::{SearchMode, UserProfile};
use chrono::{Duration, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn candidate(id: i64) -> Candidate {
    Candidate {
        profile: UserProfile {
            user_id: id,
            gender: Some(if id % 2 == 0 { "Female" } else { "Male" }.to_string()),
            city: Some("Delhi".to_string()),
            interests: vec!["music".to_string(), "movies".to_string()],
            is_banned: false,
            is_online: true,
            blocked_users: vec![],
            report_count: 0,
            reputation_score: (id % 21) as i32 - 10,
            premium_until: None,
            last_partner_id: None,
            safety_notice_sent: true,
            created_at: Some(Utc::now()),
        },
        waiting_mode: SearchMode::Open,
    }
}

fn requester(premium: bool) -> UserProfile {
    let mut profile = candidate(0).profile;
    if premium {
        profile.premium_until = Some(Utc::now() + Duration::days(7));
    }
    profile
}

fn bench_open_selection(c: &mut Criterion) {
    let policy = SelectionPolicy::default();
    let requester = requester(false);

    let mut group = c.benchmark_group("choose_partner_open");
    for size in [10usize, 100, 1000] {
        let candidates: Vec<Candidate> = (1..=size as i64).map(candidate).collect();

        group.bench_with_input(BenchmarkId::from_parameter(size), &candidates, |b, candidates| {
            let mut rng = StdRng::seed_from_u64(42);
            b.iter(|| {
                choose_partner(
                    &mut rng,
                    &requester,
                    &SearchMode::Open,
                    black_box(candidates),
                    &policy,
                )
            })
        });
    }
    group.finish();
}

fn bench_ranked_selection(c: &mut Criterion) {
    let policy = SelectionPolicy::default();
    let requester = requester(true);

    let mut group = c.benchmark_group("choose_partner_ranked");
    for size in [10usize, 100, 1000] {
        let candidates: Vec<Candidate> = (1..=size as i64).map(candidate).collect();

        group.bench_with_input(BenchmarkId::from_parameter(size), &candidates, |b, candidates| {
            let mut rng = StdRng::seed_from_u64(42);
            b.iter(|| {
                choose_partner(
                    &mut rng,
                    &requester,
                    &SearchMode::Interests,
                    black_box(candidates),
                    &policy,
                )
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_open_selection, bench_ranked_selection);
criterion_main!(benches);
