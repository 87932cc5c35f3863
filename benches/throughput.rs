use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use deckbucket::{
    card::CardEntry,
    config::OrganizerConfig,
    core::{
        builder::build_stacks,
        transfer::{Destination, TransferOutcome},
    },
    filter::{FilterKey, FilterState},
    session::{Effect, Organizer},
    types::{CardStatus, Ownership, Rarity},
};

fn deck(n: usize) -> Vec<CardEntry> {
    (0..n)
        .map(|i| CardEntry {
            name: format!("Card {i}"),
            required_quantity: 4,
            owned_quantity: (i % 5) as u32,
            net_needed_quantity: 4u32.saturating_sub((i % 5) as u32),
            status: CardStatus::ProxyNeeded,
            image_url: None,
            rarity: Rarity::ALL.get(i % 4).copied(),
            price_usd: Some((i % 30) as f64),
        })
        .collect()
}

fn bench_build(c: &mut Criterion) {
    let entries = deck(5_000);
    c.bench_function("build_stacks_5k", |b| {
        b.iter(|| build_stacks(&entries));
    });
}

fn bench_split_merge(c: &mut Criterion) {
    let entries = deck(500);
    c.bench_function("split_then_merge_500", |b| {
        b.iter(|| {
            let mut org = Organizer::open("bench", &entries, None, OrganizerConfig::default());
            for i in 0..500 {
                let id = format!("Card {i}-unowned");
                let Effect::Transfer(TransferOutcome::Split { created, .. }) = org.split(id.clone()).effect else {
                    continue;
                };
                if let Some(payload) = org.drag_payload(&created) {
                    org.drop_payload(payload, Destination::Stack(id));
                }
            }
        });
    });
}

fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("visible_stacks");
    let filter = FilterState::with_keys([
        FilterKey::Rarity(Rarity::Unique),
        FilterKey::Rarity(Rarity::Elite),
        FilterKey::Ownership(Ownership::Unowned),
    ]);

    for n in [100usize, 1_000, 5_000] {
        let mut org = Organizer::open("bench", &deck(n), None, OrganizerConfig::default());
        org.set_filter(filter.clone());
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| org.visible_stacks().len());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_build, bench_split_merge, bench_filter);
criterion_main!(benches);
