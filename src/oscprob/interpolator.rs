use std::path::Path;

use crate::{
    algorithms::polint::AxisPolicy,
    collections::AbscissaCollection,
    errors::{GridError, OscError},
    grids::multi_function::MultiFunction,
    serialization::{self, SerializationFormat},
};

use super::{
    baseline::BaselineCalculator,
    channel::{OscChannel, NUMBER_OF_OSC_CHANNELS},
    parameters::{OscParameter, OscParameterName, OscParameters, OscParametersGrid},
};

/// Number of table axes: six oscillation parameters, L/E and zenith cosine.
pub const NUMBER_OF_DIMENSIONS: usize = 8;
/// Axis of L/E [km/GeV].
pub const LOE_AXIS: usize = 6;
/// Axis of the cosine of the zenith angle.
pub const COSTH_AXIS: usize = 7;

/// Probabilities of all oscillation channels, in channel catalogue order.
pub type Probabilities = [f64; NUMBER_OF_OSC_CHANNELS];

/// On-disk layout: fixed table parameters, baseline calculator, table.
type TableFile = (OscParameters<f64>, BaselineCalculator, MultiFunction<Probabilities>);

///
/// Probability of an oscillation channel at a neutrino energy [GeV] and
/// zenith cosine.
///
pub trait OscProb
{
    fn osc_prob(&self, channel: &OscChannel, energy: f64, costh: f64) -> Result<f64, OscError>;
}

///
/// Fully specified values of the six oscillation parameters, in axis order.
///
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorkingPoint([f64; 6]);

impl WorkingPoint
{
    ///
    /// Working point of `parameters`; every parameter must be defined.
    ///
    pub fn from_parameters(parameters: &OscParameters<f64>) -> Result<Self, OscError>
    {
        let mut values = [0.0; 6];
        for (value, (name, parameter)) in values.iter_mut().zip(parameters.iter())
        {
            *value = *parameter.as_option().ok_or(OscError::MissingParameter(name.as_str()))?;
        }
        Ok(Self(values))
    }

    pub fn values(&self) -> &[f64; 6]
    {
        &self.0
    }

    pub fn get(&self, name: OscParameterName) -> f64
    {
        self.0[name as usize]
    }
}

///
/// Oscillation probabilities interpolated from a table over the six
/// oscillation parameters, L/E and the zenith cosine.
///
/// The interpolator keeps a parameter set that defaults to the NuFIT best fit
/// for normal ordering, overridden by the fixed parameters of the table.
/// [`set`](Self::set) merges new values into it; queries without explicit
/// parameters are evaluated at the resulting [`WorkingPoint`].
///
#[derive(Clone, Debug)]
pub struct OscProbInterpolator
{
    table_parameters: OscParameters<f64>,
    baseline: BaselineCalculator,
    table: MultiFunction<Probabilities>,
    parameters: OscParameters<f64>,
    working_point: WorkingPoint,
}

impl OscProbInterpolator
{
    pub fn new(table_parameters: OscParameters<f64>, baseline: BaselineCalculator, table: MultiFunction<Probabilities>) -> Result<Self, OscError>
    {
        if table.ndim() != NUMBER_OF_DIMENSIONS
        {
            return Err(OscError::InvalidTable { expected: NUMBER_OF_DIMENSIONS, actual: table.ndim() });
        }
        table_parameters.validate()?;
        let mut parameters = OscParameters::best_fit(false);
        parameters.join(&table_parameters);
        let working_point = WorkingPoint::from_parameters(&parameters)?;
        Ok(Self { table_parameters, baseline, table, parameters, working_point })
    }

    ///
    /// Tabulate `probabilities(parameters, L/E, costh)` over the parameter
    /// grids and the L/E [km/GeV] and zenith cosine axes. Parameter axes are
    /// interpolated linearly and reject values outside their grid; L/E uses
    /// second order polynomials and the zenith cosine linear interpolation,
    /// both clamped to their axes.
    ///
    pub fn tabulate<F>(parameters_grid: &OscParametersGrid, baseline: BaselineCalculator, loe_axis: AbscissaCollection, costh_axis: AbscissaCollection, probabilities: F) -> Result<Self, OscError>
    where F: Fn(&OscParameters<f64>, f64, f64) -> Probabilities + Sync
    {
        parameters_grid.validate()?;
        let mut collections = parameters_grid.values()?;
        collections.push(loe_axis);
        collections.push(costh_axis);

        let mut axes = vec![AxisPolicy::linear().strict(); 6];
        axes.push(AxisPolicy::polynomial(2)?);
        axes.push(AxisPolicy::linear());

        let table = MultiFunction::tabulate(axes, collections, |x|
        {
            let parameters = OscParameters {
                dm21sq: x[0].into(),
                dm31sq: x[1].into(),
                delta_cp: x[2].into(),
                sinsq_th12: x[3].into(),
                sinsq_th13: x[4].into(),
                sinsq_th23: x[5].into(),
            };
            probabilities(&parameters, x[LOE_AXIS], x[COSTH_AXIS])
        })?;

        // single-point grids fix the corresponding parameter
        let mut table_parameters = OscParameters::default();
        for (name, grid) in parameters_grid.iter()
        {
            if let Some(grid) = grid.as_option().filter(|grid| grid.len() == 1)
            {
                *table_parameters.get_mut(name) = OscParameter::new(grid.x(0));
            }
        }
        tracing::debug!(leaves = table.len(), "tabulated oscillation probabilities");
        Self::new(table_parameters, baseline, table)
    }

    ///
    /// Loads an oscillation probability table from file.
    ///
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, OscError>
    {
        let path = path.as_ref();
        let name = path.display().to_string();
        let file = std::fs::File::open(path).map_err(|source| OscError::FileOpen { path: name.clone(), source })?;
        let (table_parameters, baseline, mut table): TableFile = serialization::read_framed(std::io::BufReader::new(file))
            .map_err(|source| OscError::FileRead { path: name.clone(), source })?;
        table.compile().map_err(|source| OscError::FileRead { path: name.clone(), source })?;
        let interpolator = Self::new(table_parameters, baseline, table)?;
        tracing::info!(path = %name, leaves = interpolator.table.len(), "loaded oscillation probability table");
        Ok(interpolator)
    }

    ///
    /// Writes the table to file with the specified serialization format.
    ///
    pub fn save<P: AsRef<Path>>(&self, path: P, format: SerializationFormat) -> Result<(), OscError>
    {
        let path = path.as_ref();
        let name = path.display().to_string();
        let file = std::fs::File::create(path).map_err(|source| OscError::FileOpen { path: name.clone(), source })?;
        self.write(std::io::BufWriter::new(file), format).map_err(|error| match error
        {
            OscError::Grid(source) => OscError::FileWrite { path: name.clone(), source },
            error => error,
        })?;
        tracing::info!(path = %name, leaves = self.table.len(), ?format, "saved oscillation probability table");
        Ok(())
    }

    pub fn read<Reader: std::io::Read>(reader: Reader) -> Result<Self, OscError>
    {
        let (table_parameters, baseline, mut table): TableFile = serialization::read_framed(reader)?;
        table.compile()?;
        Self::new(table_parameters, baseline, table)
    }

    pub fn write<Writer: std::io::Write>(&self, writer: Writer, format: SerializationFormat) -> Result<(), OscError>
    {
        Ok(serialization::write_framed(&(&self.table_parameters, &self.baseline, &self.table), writer, format)?)
    }

    pub fn read_buffer(buffer: &[u8]) -> Result<Self, OscError>
    {
        let (table_parameters, baseline, mut table): TableFile = serialization::deserialize_framed(buffer)?;
        table.compile()?;
        Self::new(table_parameters, baseline, table)
    }

    pub fn write_buffer(&self, format: SerializationFormat) -> Result<Vec<u8>, OscError>
    {
        Ok(serialization::serialize_framed(&(&self.table_parameters, &self.baseline, &self.table), format)?)
    }

    /// Fixed oscillation parameters of the table.
    pub fn table_parameters(&self) -> &OscParameters<f64>
    {
        &self.table_parameters
    }

    pub fn baseline_calculator(&self) -> &BaselineCalculator
    {
        &self.baseline
    }

    pub fn table(&self) -> &MultiFunction<Probabilities>
    {
        &self.table
    }

    /// Parameters used by queries without explicit parameters.
    pub fn parameters(&self) -> &OscParameters<f64>
    {
        &self.parameters
    }

    pub fn working_point(&self) -> &WorkingPoint
    {
        &self.working_point
    }

    ///
    /// Working point of the current parameters overridden by the defined
    /// values in `parameters`. Does not modify the interpolator.
    ///
    pub fn resolve(&self, parameters: &OscParameters<f64>) -> Result<WorkingPoint, OscError>
    {
        parameters.validate()?;
        let mut merged = self.parameters.clone();
        merged.join(parameters);
        WorkingPoint::from_parameters(&merged)
    }

    ///
    /// Merge `parameters` into the current parameters. On error the
    /// interpolator is left unchanged.
    ///
    pub fn set(&mut self, parameters: &OscParameters<f64>) -> Result<(), OscError>
    {
        self.working_point = self.resolve(parameters)?;
        self.parameters.join(parameters);
        Ok(())
    }

    ///
    /// Probability of `channel` at the current working point.
    ///
    pub fn evaluate(&self, channel: &OscChannel, energy: f64, costh: f64) -> Result<f64, OscError>
    {
        self.evaluate_at(&self.working_point, channel, energy, costh)
    }

    ///
    /// [`set`](Self::set) followed by [`evaluate`](Self::evaluate). The new
    /// parameters remain in effect for later queries.
    ///
    pub fn evaluate_with(&mut self, parameters: &OscParameters<f64>, channel: &OscChannel, energy: f64, costh: f64) -> Result<f64, OscError>
    {
        self.set(parameters)?;
        self.evaluate(channel, energy, costh)
    }

    pub fn evaluate_at(&self, working_point: &WorkingPoint, channel: &OscChannel, energy: f64, costh: f64) -> Result<f64, OscError>
    {
        let index = channel.index().ok_or(OscError::InvalidChannel(*channel))?;
        Ok(self.probabilities_at(working_point, energy, costh)?[index])
    }

    /// Probabilities of all channels at the current working point.
    pub fn probabilities(&self, energy: f64, costh: f64) -> Result<Probabilities, OscError>
    {
        self.probabilities_at(&self.working_point, energy, costh)
    }

    pub fn probabilities_at(&self, working_point: &WorkingPoint, energy: f64, costh: f64) -> Result<Probabilities, OscError>
    {
        if !energy.is_finite() || energy <= 0.0
        {
            return Err(OscError::InvalidEnergy(energy));
        }
        if !costh.is_finite()
        {
            return Err(GridError::NonFiniteCoordinate { axis: COSTH_AXIS, x: costh }.into());
        }
        let mut coordinates = [0.0; NUMBER_OF_DIMENSIONS];
        coordinates[..6].copy_from_slice(working_point.values());
        coordinates[LOE_AXIS] = self.baseline.baseline(costh) / energy;
        coordinates[COSTH_AXIS] = costh;
        Ok(self.table.evaluate(&coordinates)?)
    }

    ///
    /// Read-only view evaluating at the working point resolved from `parameters`.
    ///
    pub fn bind(&self, parameters: &OscParameters<f64>) -> Result<BoundOscProb<'_>, OscError>
    {
        Ok(BoundOscProb { interpolator: self, working_point: self.resolve(parameters)? })
    }
}

impl OscProb for OscProbInterpolator
{
    fn osc_prob(&self, channel: &OscChannel, energy: f64, costh: f64) -> Result<f64, OscError>
    {
        self.evaluate(channel, energy, costh)
    }
}

///
/// Interpolator bound to a fixed working point; can be shared between threads.
///
#[derive(Clone, Copy, Debug)]
pub struct BoundOscProb<'a>
{
    interpolator: &'a OscProbInterpolator,
    working_point: WorkingPoint,
}

impl BoundOscProb<'_>
{
    pub fn working_point(&self) -> &WorkingPoint
    {
        &self.working_point
    }

    pub fn probabilities(&self, energy: f64, costh: f64) -> Result<Probabilities, OscError>
    {
        self.interpolator.probabilities_at(&self.working_point, energy, costh)
    }
}

impl OscProb for BoundOscProb<'_>
{
    fn osc_prob(&self, channel: &OscChannel, energy: f64, costh: f64) -> Result<f64, OscError>
    {
        self.interpolator.evaluate_at(&self.working_point, channel, energy, costh)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::oscprob::channel::{ChargeParity, Flavour, OSC_CHANNELS};
    use approx::assert_relative_eq;
    use rayon::prelude::*;

    /// Two-flavour muon/tau mixing in vacuum; electrons do not oscillate.
    fn two_flavour(parameters: &OscParameters<f64>, loe: f64, _costh: f64) -> Probabilities
    {
        let dm31sq = *parameters.dm31sq.value().unwrap();
        let sinsq = *parameters.sinsq_th23.value().unwrap();
        let phase = (1.267 * dm31sq * loe).sin();
        let p_mu_tau = 4.0 * sinsq * (1.0 - sinsq) * phase * phase;
        std::array::from_fn(|i|
        {
            let channel = OSC_CHANNELS[i];
            match (channel.input, channel.output)
            {
                (Flavour::Electron, Flavour::Electron) => 1.0,
                (Flavour::Electron, _) | (_, Flavour::Electron) => 0.0,
                (input, output) if input == output => 1.0 - p_mu_tau,
                _ => p_mu_tau,
            }
        })
    }

    fn parameters_grid() -> OscParametersGrid
    {
        let mut grid = OscParametersGrid::best_fit(false);
        grid.set("dM31sq", AbscissaCollection::grid(3, 2.4e-3, 2.6e-3).unwrap()).unwrap();
        grid.set("sinsqTh23", AbscissaCollection::grid(3, 0.4, 0.6).unwrap()).unwrap();
        grid
    }

    fn interpolator() -> OscProbInterpolator
    {
        OscProbInterpolator::tabulate(&parameters_grid(), BaselineCalculator::new(2.0, 12862.0).unwrap(),
            AbscissaCollection::grid(401, 0.0, 2000.0).unwrap(), AbscissaCollection::grid(3, -1.0, 1.0).unwrap(),
            two_flavour).unwrap()
    }

    fn mu_tau() -> OscChannel
    {
        OscChannel::new(Flavour::Muon, Flavour::Tau, ChargeParity::Particle)
    }

    #[test]
    fn test_tabulated_layout()
    {
        let interpolator = interpolator();
        assert_eq!(interpolator.table().ndim(), NUMBER_OF_DIMENSIONS);
        assert_eq!(interpolator.table().len(), 3 * 3 * 401 * 3);
        assert_eq!(interpolator.table_parameters().size(), 4);
        assert!(!interpolator.table_parameters().dm31sq.is_defined());
        assert_eq!(interpolator.working_point(), &WorkingPoint::from_parameters(&OscParameters::best_fit(false)).unwrap());
        assert_eq!(interpolator.working_point().get(OscParameterName::SinsqTh23), 0.450);
    }

    #[test]
    fn test_mu_tau_probability()
    {
        let mut interpolator = interpolator();
        let mut parameters = OscParameters::default();
        parameters.set("dM31sq", 2.5e-3).unwrap().set("sinsqTh23", 0.5).unwrap();
        interpolator.set(&parameters).unwrap();

        let calculator = interpolator.baseline_calculator();
        for (energy, costh) in [(10.0, -0.5), (25.0, -1.0), (3.7, -0.1), (40.0, 0.3)]
        {
            let p = interpolator.evaluate(&mu_tau(), energy, costh).unwrap();
            assert!((0.0..=1.0).contains(&p));
            let loe = calculator.baseline(costh) / energy;
            let expected = two_flavour(interpolator.parameters(), loe, costh)[5];
            assert_relative_eq!(p, expected, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_unitarity_is_preserved()
    {
        let interpolator = interpolator();
        let p = interpolator.probabilities(7.5, -0.8).unwrap();
        assert_relative_eq!(p[3] + p[4] + p[5], 1.0, epsilon = 1e-12);
        assert_relative_eq!(p[12] + p[13] + p[14], 1.0, epsilon = 1e-12);
        assert_relative_eq!(p[0], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_invalid_queries()
    {
        let interpolator = interpolator();
        let undefined = OscChannel::new(Flavour::Undefined, Flavour::Tau, ChargeParity::Particle);
        assert!(matches!(interpolator.evaluate(&undefined, 10.0, -0.5), Err(OscError::InvalidChannel(_))));
        assert!(matches!(interpolator.evaluate(&OscChannel::from_pdg(14, 16, 0), 10.0, -0.5), Err(OscError::InvalidChannel(_))));
        for energy in [0.0, -1.0, f64::NAN, f64::INFINITY]
        {
            assert!(matches!(interpolator.evaluate(&mu_tau(), energy, -0.5), Err(OscError::InvalidEnergy(_))));
        }
        assert!(matches!(interpolator.evaluate(&mu_tau(), 10.0, f64::NAN), Err(OscError::Grid(GridError::NonFiniteCoordinate { axis: COSTH_AXIS, .. }))));
    }

    #[test]
    fn test_set_merges_and_persists()
    {
        let mut interpolator = interpolator();
        let mut parameters = OscParameters::default();
        parameters.set("sinsqTh23", 0.6).unwrap();
        let first = interpolator.evaluate_with(&parameters, &mu_tau(), 10.0, -0.5).unwrap();
        assert_eq!(interpolator.working_point().get(OscParameterName::SinsqTh23), 0.6);
        // the other parameters keep their values
        assert_eq!(interpolator.working_point().get(OscParameterName::DM31sq), 2.510e-3);
        assert_eq!(interpolator.evaluate(&mu_tau(), 10.0, -0.5).unwrap(), first);

        let mut invalid = OscParameters::default();
        invalid.sinsq_th13 = OscParameter::new(-0.1);
        let before = *interpolator.working_point();
        assert!(matches!(interpolator.set(&invalid), Err(OscError::InvalidParameterValue { name: "sinsqTh13", .. })));
        assert_eq!(interpolator.working_point(), &before);
        assert!(matches!(WorkingPoint::from_parameters(&OscParameters::default()), Err(OscError::MissingParameter("dM21sq"))));
    }

    #[test]
    fn test_parameters_outside_table()
    {
        let mut interpolator = interpolator();
        let mut parameters = OscParameters::default();
        parameters.set("dM31sq", 3.0e-3).unwrap();
        interpolator.set(&parameters).unwrap();
        assert!(matches!(interpolator.evaluate(&mu_tau(), 10.0, -0.5), Err(OscError::Grid(GridError::OutOfDomain { axis: 1, .. }))));
        // fixed table parameters cannot be moved either
        let mut parameters = OscParameters::default();
        parameters.set("deltaCP", 1.0).unwrap();
        assert!(interpolator.bind(&parameters).unwrap().osc_prob(&mu_tau(), 10.0, -0.5).is_err());
    }

    #[test]
    fn test_bound_evaluation_is_thread_safe()
    {
        let interpolator = interpolator();
        let mut parameters = OscParameters::default();
        parameters.set("sinsqTh23", 0.55).unwrap();
        let bound = interpolator.bind(&parameters).unwrap();
        // binding does not change the interpolator
        assert_eq!(interpolator.working_point().get(OscParameterName::SinsqTh23), 0.450);

        let queries: Vec<(f64, f64)> = (0..200).map(|i| (1.0 + 0.25 * i as f64, -1.0 + 0.01 * i as f64)).collect();
        let parallel: Vec<f64> = queries.par_iter().map(|&(energy, costh)| bound.osc_prob(&mu_tau(), energy, costh).unwrap()).collect();
        for (&(energy, costh), p) in queries.iter().zip(parallel)
        {
            assert_eq!(bound.osc_prob(&mu_tau(), energy, costh).unwrap(), p);
        }
    }

    #[test]
    fn test_save_and_load()
    {
        let interpolator = interpolator();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("oscprob.bin");
        interpolator.save(&path, SerializationFormat::BincodeLz4).unwrap();
        let loaded = OscProbInterpolator::load(&path).unwrap();
        assert_eq!(loaded.table_parameters(), interpolator.table_parameters());
        assert_eq!(loaded.baseline_calculator(), interpolator.baseline_calculator());
        assert_eq!(loaded.evaluate(&mu_tau(), 12.0, -0.7).unwrap(), interpolator.evaluate(&mu_tau(), 12.0, -0.7).unwrap());

        let bytes = interpolator.write_buffer(SerializationFormat::Bincode).unwrap();
        assert_eq!(OscProbInterpolator::read_buffer(&bytes).unwrap().write_buffer(SerializationFormat::Bincode).unwrap(), bytes);

        assert!(matches!(OscProbInterpolator::load(dir.path().join("missing.bin")), Err(OscError::FileOpen { .. })));
        let corrupt = dir.path().join("corrupt.bin");
        std::fs::write(&corrupt, &bytes[..bytes.len() / 3]).unwrap();
        assert!(matches!(OscProbInterpolator::load(&corrupt), Err(OscError::FileRead { .. })));
    }

    #[test]
    fn test_invalid_baseline_in_file_is_rejected()
    {
        #[derive(serde::Serialize)]
        struct Limits
        {
            lmin: f64,
            lmax: f64,
        }

        let interpolator = interpolator();
        let dir = tempfile::tempdir().unwrap();
        for format in [SerializationFormat::Bincode, SerializationFormat::Json]
        {
            let bytes = serialization::serialize_framed(
                &(interpolator.table_parameters(), Limits { lmin: -50.0, lmax: -100.0 }, interpolator.table()), format).unwrap();
            assert!(matches!(OscProbInterpolator::read_buffer(&bytes), Err(OscError::Grid(GridError::DeserializationFailed(_)))));
            let path = dir.path().join("inverted.bin");
            std::fs::write(&path, &bytes).unwrap();
            assert!(matches!(OscProbInterpolator::load(&path), Err(OscError::FileRead { .. })));
        }
    }

    #[test]
    fn test_wrong_table_dimension()
    {
        let table = MultiFunction::tabulate(vec![AxisPolicy::linear()], vec![AbscissaCollection::grid(2, 0.0, 1.0).unwrap()], |_| [0.0; NUMBER_OF_OSC_CHANNELS]).unwrap();
        let baseline = BaselineCalculator::new(2.0, 12862.0).unwrap();
        assert!(matches!(OscProbInterpolator::new(OscParameters::default(), baseline, table), Err(OscError::InvalidTable { expected: 8, actual: 1 })));
    }
}
