use oscgrid::{
    collections::AbscissaCollection,
    errors::OscError,
    oscprob::{
        baseline::BaselineCalculator,
        channel::{ChargeParity, Flavour, OscChannel, OSC_CHANNELS},
        interpolator::{OscProb, OscProbInterpolator, Probabilities},
        parameters::{OscParameter, OscParameters, OscParametersGrid},
    },
    serialization::SerializationFormat,
};
use tracing_subscriber::EnvFilter;

/// Converts `dm^2 [eV^2] * L [km] / E [GeV]` into the oscillation phase `dm^2 L / 4E`.
const EV_SQ_KM_TO_GEV_OVER4: f64 = 1e-9 / 1.97327e-7 * 1e3 / 4.0;

fn flavour_index(flavour: Flavour) -> usize
{
    match flavour
    {
        Flavour::Electron => 0,
        Flavour::Muon => 1,
        _ => 2,
    }
}

///
/// Three-flavour oscillation probabilities in vacuum, `P[alpha][beta]` for
/// `alpha -> beta`, with `delta` in radians.
///
fn vacuum_probabilities(s12sq: f64, s13sq: f64, s23sq: f64, delta: f64, dm21sq: f64, dm31sq: f64, loe: f64) -> [[f64; 3]; 3]
{
    let c13sq = 1.0 - s13sq;
    let ue3 = s13sq;
    let ue2 = c13sq * s12sq;
    let um3 = c13sq * s23sq;
    let ut2_tmp = s13sq * s12sq * s23sq;
    let um2_tmp = (1.0 - s12sq) * (1.0 - s23sq);

    let jrr = (um2_tmp * ut2_tmp).sqrt();
    let um2 = um2_tmp + ut2_tmp - 2.0 * jrr * delta.cos();
    let jvac = 8.0 * jrr * c13sq * delta.sin();

    let ue1 = 1.0 - ue3 - ue2;
    let um1 = 1.0 - um3 - um2;
    let ut3 = 1.0 - um3 - ue3;
    let ut2 = 1.0 - um2 - ue2;
    let ut1 = 1.0 - um1 - ue1;

    let d21 = dm21sq * EV_SQ_KM_TO_GEV_OVER4 * loe;
    let d31 = dm31sq * EV_SQ_KM_TO_GEV_OVER4 * loe;
    let (sin21, sin31, sin32) = (d21.sin(), d31.sin(), (d31 - d21).sin());
    let triple_sin = sin21 * sin31 * sin32;
    let (sq21, sq31, sq32) = (2.0 * sin21 * sin21, 2.0 * sin31 * sin31, 2.0 * sin32 * sin32);

    let pme_cpc = (ut3 - um2 * ue1 - um1 * ue2) * sq21
        + (ut2 - um3 * ue1 - um1 * ue3) * sq31
        + (ut1 - um3 * ue2 - um2 * ue3) * sq32;
    let pme_cpv = -jvac * triple_sin;
    let pmm = 1.0 - 2.0 * (um2 * um1 * sq21 + um3 * um1 * sq31 + um3 * um2 * sq32);
    let pee = 1.0 - 2.0 * (ue2 * ue1 * sq21 + ue3 * ue1 * sq31 + ue3 * ue2 * sq32);

    let pem = pme_cpc - pme_cpv;
    let pme = pme_cpc + pme_cpv;
    let pet = 1.0 - pee - pem;
    let pmt = 1.0 - pme - pmm;
    [
        [pee, pem, pet],
        [pme, pmm, pmt],
        [1.0 - pee - pme, 1.0 - pem - pmm, 1.0 - pet - pmt],
    ]
}

/// Probabilities of all channels; anti-neutrinos see `-deltaCP`.
fn probabilities(parameters: &OscParameters<f64>, loe: f64, _costh: f64) -> Probabilities
{
    let value = |p: &OscParameter<f64>| p.as_option().copied().unwrap_or_default();
    let delta = value(&parameters.delta_cp) * std::f64::consts::PI;
    let matrix = |delta: f64| vacuum_probabilities(value(&parameters.sinsq_th12), value(&parameters.sinsq_th13),
        value(&parameters.sinsq_th23), delta, value(&parameters.dm21sq), value(&parameters.dm31sq), loe);
    let (particle, antiparticle) = (matrix(delta), matrix(-delta));
    std::array::from_fn(|i|
    {
        let channel = OSC_CHANNELS[i];
        let matrix = if channel.cparity == ChargeParity::Particle { &particle } else { &antiparticle };
        matrix[flavour_index(channel.input)][flavour_index(channel.output)]
    })
}

fn main() -> Result<(), OscError>
{
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    println!("\nTabulating vacuum oscillation probabilities\n");
    let mut grid = OscParametersGrid::best_fit(false);
    grid.set("dM31sq", AbscissaCollection::grid(5, 2.3e-3, 2.7e-3)?)?
        .set("deltaCP", AbscissaCollection::grid(5, 0.0, 2.0)?)?
        .set("sinsqTh23", AbscissaCollection::grid(3, 0.4, 0.6)?)?;
    let baseline = BaselineCalculator::new(2.0, 12862.0)?;
    let interpolator = OscProbInterpolator::tabulate(&grid, baseline, AbscissaCollection::grid(501, 0.0, 4000.0)?,
        AbscissaCollection::grid(3, -1.0, 1.0)?, probabilities)?;
    println!("fixed table parameters: {}", interpolator.table_parameters());
    println!("table size: {}", interpolator.table().len());

    let path = std::env::temp_dir().join("oscgrid_oscprob_table.bin");
    interpolator.save(&path, SerializationFormat::BincodeLz4)?;
    let mut interpolator = OscProbInterpolator::load(&path)?;

    let mut parameters = OscParameters::default();
    parameters.set("dM31sq", 2.45e-3)?.set("deltaCP", 1.5)?.set("sinsqTh23", 0.52)?;
    interpolator.set(&parameters)?;
    println!("working point: {}", interpolator.parameters());

    let mu_mu = OscChannel::new(Flavour::Muon, Flavour::Muon, ChargeParity::Particle);
    let mu_e = OscChannel::new(Flavour::Muon, Flavour::Electron, ChargeParity::Particle);
    let mu_e_bar = OscChannel::new(Flavour::Muon, Flavour::Electron, ChargeParity::Antiparticle);
    let exact = interpolator.parameters().clone();
    for (energy, costh) in [(5.0, -1.0), (10.0, -0.6), (25.0, -0.8), (3.0, 0.2)]
    {
        let loe = baseline.baseline(costh) / energy;
        let expected = probabilities(&exact, loe, costh);
        for channel in [mu_mu, mu_e, mu_e_bar]
        {
            let p = interpolator.osc_prob(&channel, energy, costh)?;
            let index = channel.index().ok_or(OscError::InvalidChannel(channel))?;
            println!("E={energy:>5} GeV, costh={costh:>5}: P({channel}) = {p:.6}, exact {:.6}", expected[index]);
        }
    }

    match interpolator.evaluate(&mu_mu, -1.0, 0.0)
    {
        Ok(p) => println!("P = {p}"),
        Err(error) => println!("negative energy rejected: {error}"),
    }
    std::fs::remove_file(&path).map_err(|source| OscError::FileOpen { path: path.display().to_string(), source })?;
    Ok(())
}
