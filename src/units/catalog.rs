// ============================================================================
// Common Units
// SI base units plus the angle and temperature scales the engine special-cases
// ============================================================================

use super::unit::Unit;
use once_cell::sync::Lazy;
use std::f64::consts::PI;

static METER: Lazy<Unit> = Lazy::new(|| Unit::base("length", "m"));
static SECOND: Lazy<Unit> = Lazy::new(|| Unit::base("time", "s"));
static KILOGRAM: Lazy<Unit> = Lazy::new(|| Unit::base("mass", "kg"));
static KELVIN: Lazy<Unit> = Lazy::new(|| Unit::base("temperature", "K"));
static AMPERE: Lazy<Unit> = Lazy::new(|| Unit::base("electric current", "A"));
static MOLE: Lazy<Unit> = Lazy::new(|| Unit::base("amount of substance", "mol"));
static CANDELA: Lazy<Unit> = Lazy::new(|| Unit::base("luminous intensity", "cd"));
static RADIAN: Lazy<Unit> = Lazy::new(|| Unit::base("plane angle", "rad"));

// The fallbacks below are unreachable: the factors are finite and non-zero.
static DEGREE: Lazy<Unit> = Lazy::new(|| {
    RADIAN
        .scale(PI / 180.0)
        .map(|u| u.named("deg"))
        .unwrap_or(Unit::Wildcard)
});
static CELSIUS: Lazy<Unit> = Lazy::new(|| {
    KELVIN
        .shift(273.15)
        .map(|u| u.named("degC"))
        .unwrap_or(Unit::Wildcard)
});
static FAHRENHEIT: Lazy<Unit> = Lazy::new(|| {
    KELVIN
        .scale(1.0 / 1.8)
        .and_then(|u| u.shift(459.67))
        .map(|u| u.named("degF"))
        .unwrap_or(Unit::Wildcard)
});

pub fn meter() -> Unit {
    METER.clone()
}

pub fn second() -> Unit {
    SECOND.clone()
}

pub fn kilogram() -> Unit {
    KILOGRAM.clone()
}

pub fn kelvin() -> Unit {
    KELVIN.clone()
}

pub fn ampere() -> Unit {
    AMPERE.clone()
}

pub fn mole() -> Unit {
    MOLE.clone()
}

pub fn candela() -> Unit {
    CANDELA.clone()
}

pub fn radian() -> Unit {
    RADIAN.clone()
}

/// The unit "1"
pub fn dimensionless() -> Unit {
    Unit::dimensionless()
}

/// Convertible with any unit, including an absent one
pub fn wildcard() -> Unit {
    Unit::Wildcard
}

/// Angle degree: radian × π/180
pub fn degree() -> Unit {
    DEGREE.clone()
}

/// Kelvin shifted by 273.15
pub fn celsius() -> Unit {
    CELSIUS.clone()
}

/// 459.67-offset, 1/1.8-scaled kelvin
pub fn fahrenheit() -> Unit {
    FAHRENHEIT.clone()
}

/// True when `unit` is exactly the angle degree.
pub fn is_degree(unit: Option<&Unit>) -> bool {
    matches!(unit, Some(u) if !u.is_wildcard() && *u == *DEGREE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degree_radian_relation() {
        let rad = radian();
        let deg = degree();
        assert!((rad.to_this(180.0, &deg).unwrap() - PI).abs() < 1e-12);
        assert_eq!(deg.to_string(), "deg");
        assert!(is_degree(Some(&deg)));
        assert!(!is_degree(Some(&rad)));
        assert!(!is_degree(None));
    }

    #[test]
    fn test_temperature_scales() {
        let k = kelvin();
        assert!((k.to_this(0.0, &celsius()).unwrap() - 273.15).abs() < 1e-12);
        assert!((celsius().to_this(212.0, &fahrenheit()).unwrap() - 100.0).abs() < 1e-9);
        assert_eq!(celsius().absolute(), k);
    }
}
