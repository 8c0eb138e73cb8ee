//! Fixed values of the catchment model.

// -- FAO56 --

/// Day number of the fixed radiation epoch (1 January 2010).
pub const EPOCH_DAY_OF_YEAR: f64 = 1.0;
/// Specific heat of air at constant pressure [MJ kg⁻¹ °C⁻¹].
pub const CP_AIR: f64 = 1.013e-3;
/// Latent heat of vaporization [MJ kg⁻¹].
pub const LATENT_HEAT: f64 = 2.45;
/// Ratio of molecular weights of water vapour and dry air.
pub const EPSILON_MW: f64 = 0.622;
/// Solar constant [MJ m⁻² min⁻¹].
pub const SOLAR_CONSTANT: f64 = 0.0820;
/// Hargreaves radiation adjustment coefficient for interior regions.
pub const HARGREAVES_KRS: f64 = 0.16;
/// Stefan-Boltzmann constant [MJ K⁻⁴ m⁻² day⁻¹].
pub const STEFAN_BOLTZMANN: f64 = 4.903e-9;
/// Albedo of the grass reference crop.
pub const ALBEDO_REFERENCE: f64 = 0.23;
/// Albedo used for open water evaporation.
pub const ALBEDO_OPEN_WATER: f64 = 0.05;
/// Barometric exponent in the FAO56 pressure equation.
pub const BAROMETRIC_EXPONENT: f64 = 5.26;

// -- Wind profile --

/// Roughness length of the FAO56 reference crop [m].
pub const ROUGHNESS_LENGTH_M: f64 = 0.006247;
/// Height of the gridded wind field [m].
pub const WIND_HEIGHT_10M: f64 = 10.0;
/// Height wind is required at [m].
pub const WIND_HEIGHT_2M: f64 = 2.0;
/// Von Kármán constant reciprocal used by the log profile.
pub const LOG_PROFILE_FACTOR: f64 = 2.5;

// -- Stores --

/// Shape exponent of the Pareto storage distribution. Fixed at 1 until the
/// parameter file carries it.
pub const PARETO_SHAPE: f64 = 1.0;
/// Exponent of the linear (slow) routing store.
pub const LINEAR_EXPONENT: f64 = 1.0;
/// Exponent of the non-linear (fast) routing store.
pub const NON_LINEAR_EXPONENT: f64 = 5.0 / 3.0;
/// qmax is calibrated on daily data.
pub const DT_DAY: f64 = 1.0;

// -- Forcing --

/// Weather records per day in the gridded forecast feed.
pub const DEFAULT_STEPS_PER_DAY: usize = 4;
