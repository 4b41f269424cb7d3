//! Persona state-engine benchmarks.
//!
//! Everything here runs on every conversational turn or clock tick, so each
//! path should stay well under a millisecond:
//!   relationship_classify_grid ....... 21x21 score grid
//!   display_resolve .................. one badge
//!   gap_analyze_200_messages ......... full scan window
//!   world_book_retrieve_500_entries .. five enabled books

use std::hint::black_box;

use chrono::{DateTime, Duration, TimeZone, Utc};
use chrono_tz::Tz;
use criterion::{Criterion, criterion_group, criterion_main};

use persona_core::display::{DisplayInput, DisplayResolver};
use persona_core::gap::GapAnalyzer;
use persona_core::mood::{MoodClock, MoodState, MoodStatus};
use persona_core::relationship::{RelationshipClassifier, RelationshipStatus};
use persona_core::world_book::{self, KnowledgeBase, WorldBookEntry};
use persona_core::{EmotionVector, Message, PersonalityTraits};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

fn bench_relationship(c: &mut Criterion) {
    let classifier = RelationshipClassifier::standard();
    let traits = PersonalityTraits::default();

    c.bench_function("relationship_classify_grid", |b| {
        b.iter(|| {
            for romance in (-100..=100).step_by(10) {
                for friendship in (-100..=100).step_by(10) {
                    black_box(classifier.classify(
                        black_box(romance),
                        black_box(friendship),
                        &traits,
                        RelationshipStatus::Honeymoon,
                    ));
                }
            }
        });
    });
}

fn bench_display(c: &mut Criterion) {
    let resolver = DisplayResolver::standard();
    let input = DisplayInput {
        energy: 35,
        status: MoodStatus::Awake,
        emotions: EmotionVector::new(20, 40, 75, 70, 10),
        friendship_score: 30,
        local_hour: 22,
    };

    c.bench_function("display_resolve", |b| {
        b.iter(|| black_box(resolver.resolve(black_box(&input))));
    });
}

fn bench_mood_tick(c: &mut Criterion) {
    let clock = MoodClock::default();
    let mood = MoodState::default();
    let now = t0();

    c.bench_function("mood_tick", |b| {
        b.iter(|| black_box(clock.tick(black_box(&mood), Tz::Asia__Tokyo, now)));
    });
}

fn bench_gap(c: &mut Criterion) {
    let analyzer = GapAnalyzer::default();
    let history: Vec<Message> = (0..200)
        .map(|i| {
            let at = t0() + Duration::minutes(i * 7);
            if i % 2 == 0 {
                Message::user(format!("user message {i}"), at)
            } else {
                Message::assistant(format!("reply {i}"), at)
            }
        })
        .collect();
    let now = (t0() + Duration::days(2)).with_timezone(&Tz::Europe__Berlin);

    c.bench_function("gap_analyze_200_messages", |b| {
        b.iter(|| black_box(analyzer.analyze(black_box(&history), now)));
    });
}

fn bench_world_book(c: &mut Criterion) {
    let bases: Vec<KnowledgeBase> = (0..5)
        .map(|book| {
            (0..100).fold(KnowledgeBase::new(format!("book {book}")), |kb, i| {
                let entry = if i % 25 == 0 {
                    WorldBookEntry::constant(format!("Always-on fact {book}-{i}."))
                } else {
                    WorldBookEntry::keyword(
                        [format!("keyword{book}x{i}"), format!("alias{i}")],
                        format!("Lore entry {book}-{i}."),
                    )
                    .unwrap_or_else(|_| WorldBookEntry::constant("unreachable"))
                };
                kb.with_entry(entry)
            })
        })
        .collect();
    let enabled: Vec<_> = bases.iter().map(|kb| kb.id).collect();
    let text = "Tell me about keyword2x17 and ALIAS42, and what happened at the harbour.";

    c.bench_function("world_book_retrieve_500_entries", |b| {
        b.iter(|| black_box(world_book::retrieve(black_box(text), &bases, &enabled)));
    });
}

criterion_group!(
    benches,
    bench_relationship,
    bench_display,
    bench_mood_tick,
    bench_gap,
    bench_world_book,
);
criterion_main!(benches);
