use criterion::{criterion_group, criterion_main, Criterion};
use oscgrid::{
    algorithms::polint::AxisPolicy,
    collections::AbscissaCollection,
    errors::{GridError, OscError},
    grids::multi_function::MultiFunction,
    oscprob::{
        baseline::BaselineCalculator,
        channel::{OscChannel, OSC_CHANNELS},
        interpolator::{OscProbInterpolator, Probabilities},
        parameters::{OscParameters, OscParametersGrid},
    },
};

fn build_4d_table(axis: AxisPolicy) -> Result<MultiFunction<f64>, GridError>
{
    let collections = vec![AbscissaCollection::grid(21, 0.0, 1.0)?; 4];
    MultiFunction::tabulate(vec![axis; 4], collections, |x| x.iter().map(|xi| xi * xi).sum::<f64>())
}

/// Two-flavour muon/tau mixing; electrons do not oscillate.
fn two_flavour(parameters: &OscParameters<f64>, loe: f64, _costh: f64) -> Probabilities
{
    let dm31sq = parameters.dm31sq.as_option().copied().unwrap_or_default();
    let sinsq = parameters.sinsq_th23.as_option().copied().unwrap_or_default();
    let phase = (1.267 * dm31sq * loe).sin();
    let p = 4.0 * sinsq * (1.0 - sinsq) * phase * phase;
    std::array::from_fn(|i|
    {
        let channel = OSC_CHANNELS[i];
        match (channel.input.pdg(), channel.output.pdg())
        {
            (12, 12) => 1.0,
            (12, _) | (_, 12) => 0.0,
            (a, b) if a == b => 1.0 - p,
            _ => p,
        }
    })
}

fn build_osc_table() -> Result<OscProbInterpolator, OscError>
{
    let mut grid = OscParametersGrid::best_fit(false);
    grid.set("dM31sq", AbscissaCollection::grid(5, 2.3e-3, 2.7e-3)?)?
        .set("sinsqTh23", AbscissaCollection::grid(5, 0.4, 0.6)?)?;
    OscProbInterpolator::tabulate(&grid, BaselineCalculator::new(2.0, 12862.0)?,
        AbscissaCollection::grid(801, 0.0, 4000.0)?, AbscissaCollection::grid(11, -1.0, 1.0)?, two_flavour)
}

/// Single-point lookups in a 4D scalar table for each interpolation order.
fn bench_4d_lookup(c: &mut Criterion)
{
    let linear = build_4d_table(AxisPolicy::linear()).unwrap();
    let cubic = build_4d_table(AxisPolicy::polynomial(3).unwrap()).unwrap();
    let flat = build_4d_table(AxisPolicy::flat()).unwrap();
    let x = [0.33, 0.51, 0.27, 0.74];

    let mut group = c.benchmark_group("4D Lookup");
    group.bench_function("flat", |b| b.iter(|| flat.evaluate(&x).unwrap()));
    group.bench_function("linear", |b| b.iter(|| linear.evaluate(&x).unwrap()));
    group.bench_function("cubic", |b| b.iter(|| cubic.evaluate(&x).unwrap()));
    group.finish();

    println!("4D table size: {}", linear.len());
}

/// 1000 lookups, sequential and batched.
fn bench_4d_batch(c: &mut Criterion)
{
    let table = build_4d_table(AxisPolicy::linear()).unwrap();
    let points: Vec<[f64; 4]> = (0..1000).map(|i|
    {
        let t = i as f64 / 1000.0;
        [t, 1.0 - t, 0.5 * t, 0.25 + 0.5 * t]
    }).collect();

    let mut group = c.benchmark_group("4D 1000x Lookup");
    group.bench_function("sequential", |b|
    {
        b.iter(|| points.iter().map(|x| table.evaluate(x).unwrap()).sum::<f64>())
    });
    group.bench_function("batch", |b| b.iter(|| table.evaluate_batch(&points).unwrap()));
    group.finish();
}

fn bench_osc_prob(c: &mut Criterion)
{
    let interpolator = build_osc_table().unwrap();
    let channel = OscChannel::from_pdg(14, 16, 1);
    let mut parameters = OscParameters::default();
    parameters.set("dM31sq", 2.45e-3).unwrap().set("sinsqTh23", 0.52).unwrap();
    let bound = interpolator.bind(&parameters).unwrap();

    let mut group = c.benchmark_group("Oscillation Probability");
    group.bench_function("evaluate", |b| b.iter(|| interpolator.evaluate(&channel, 12.0, -0.4).unwrap()));
    group.bench_function("bound probabilities", |b| b.iter(|| bound.probabilities(12.0, -0.4).unwrap()));
    group.bench_function("resolve", |b| b.iter(|| interpolator.resolve(&parameters).unwrap()));
    group.finish();

    println!("Oscillation table size: {}", interpolator.table().len());
}

criterion_group!(benches, bench_4d_lookup, bench_4d_batch, bench_osc_prob);
criterion_main!(benches);
