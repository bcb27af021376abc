use criterion::{criterion_group, criterion_main, Criterion};
use emod::transmission::{
    create_transmission_groups, ContagionStrain, IndividualProperties, TransmissionGroupMembership,
    TransmissionGroupType, TransmissionGroups,
};

static AGE_BINS: usize = 10;
static RISK_LEVELS: usize = 5;
static POPULATION: usize = 10_000;

fn values(prefix: &str, n: usize) -> Vec<String> {
    (0..n).map(|i| format!("{prefix}{i}")).collect()
}

fn mixing(n: usize) -> Vec<Vec<f64>> {
    (0..n)
        .map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.1 }).collect())
        .collect()
}

fn setup() -> (Box<dyn TransmissionGroups>, Vec<TransmissionGroupMembership>) {
    let mut groups = create_transmission_groups(TransmissionGroupType::MultiRoute);
    groups
        .add_property("AGE", &values("AGE", AGE_BINS), &mixing(AGE_BINS), "CONTACT")
        .unwrap();
    groups
        .add_property("RISK", &values("RISK", RISK_LEVELS), &mixing(RISK_LEVELS), "CONTACT")
        .unwrap();
    let decay = [("CONTACT".to_string(), 0.5)].into_iter().collect();
    groups.build(&decay, 1, 1).unwrap();

    let memberships = (0..POPULATION)
        .map(|i| {
            let properties: IndividualProperties = [
                ("AGE".to_string(), format!("AGE{}", i % AGE_BINS)),
                ("RISK".to_string(), format!("RISK{}", i % RISK_LEVELS)),
            ]
            .into_iter()
            .collect();
            let mut membership = TransmissionGroupMembership::new();
            groups
                .get_group_membership_for_properties(&["CONTACT"], &properties, &mut membership)
                .unwrap();
            groups.update_population_size(&membership, 1.0, 1.0).unwrap();
            membership
        })
        .collect();
    (groups, memberships)
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let (mut groups, memberships) = setup();
    let strain = ContagionStrain::default();
    c.bench_function("transmission deposit and end_update", |bencher| {
        bencher.iter(|| {
            for membership in memberships.iter().step_by(7) {
                groups.deposit_contagion(&strain, 1.0, membership).unwrap();
            }
            groups.end_update(1.0).unwrap();
        });
    });
}

criterion_group!(transmission_benches, criterion_benchmark);
criterion_main!(transmission_benches);
