use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use slotplan_libs::bitmap::{decode, encode};
use slotplan_libs::input::generate_team_id;
use slotplan_libs::repository::{MemoryBlobStore, MemoryScheduleRepository, ScheduleRepository};
use slotplan_libs::service::{event_availability, team_heatmap};
use slotplan_libs::{AggregateVector, BitmapKey, Heatmap, SlotVector, StoreConfig, WeekSchedule};

fn members(count: usize) -> Vec<SlotVector> {
    (0..count)
        .map(|member| {
            let text = (0..48)
                .map(|slot| if (slot + member) % 3 == 0 { '0' } else { '1' })
                .collect::<String>();
            SlotVector::parse(&text).unwrap()
        })
        .collect()
}

fn vectors_and_bitmaps(c: &mut Criterion) {
    c.bench_function("parse", |b| {
        let text = format!("{}{}", "0".repeat(18), "1".repeat(30));

        b.iter(|| black_box(SlotVector::parse(&text)))
    });

    c.bench_function("heatmap", |b| {
        let vectors = members(9);

        b.iter(|| {
            let heatmap: AggregateVector = black_box(vectors.iter().heatmap().unwrap());
            black_box(heatmap.render())
        })
    });

    c.bench_function("encode", |b| {
        let mut week = WeekSchedule::all(false);
        for day in 0..7 {
            for slot in (18..36).step_by(day + 1) {
                week.set(day, slot, true);
            }
        }

        b.iter(|| black_box(encode(&week)))
    });

    c.bench_function("decode", |b| {
        let blob = encode(&WeekSchedule::all(true));

        b.iter(|| black_box(decode(&blob)))
    });
}

fn repository_flows(c: &mut Criterion) {
    c.bench_function("event_availability", |b| {
        let repo = MemoryScheduleRepository::new(StoreConfig::default(), MemoryBlobStore::new());
        let dates = (1..=5)
            .map(|day| repo.add_event_date(1, NaiveDate::from_ymd_opt(2026, 11, day).unwrap()))
            .collect::<Vec<_>>();

        for (member, vector) in members(9).iter().enumerate() {
            for date in &dates {
                repo.upsert_entry(1, *date, &format!("member-{}", member), vector)
                    .unwrap();
            }
        }

        b.iter(|| black_box(event_availability(&repo, 1)))
    });

    c.bench_function("team_heatmap", |b| {
        let repo = MemoryScheduleRepository::new(StoreConfig::default(), MemoryBlobStore::new());
        let team = generate_team_id();
        let keys = (0..20)
            .map(|member| {
                BitmapKey::new(&team, Some("design"), &format!("member-{}", member))
            })
            .collect::<Vec<_>>();

        for key in keys.iter().step_by(2) {
            repo.write_bitmap(key, encode(&WeekSchedule::all(true)))
                .unwrap();
        }

        b.iter(|| black_box(team_heatmap(&repo, &keys)))
    });
}

criterion_group!(benches, vectors_and_bitmaps, repository_flows);
criterion_main!(benches);
