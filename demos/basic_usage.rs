// ============================================================================
// Basic Usage Example
// ============================================================================

use std::sync::Arc;
use unitfield::prelude::*;

fn main() -> Result<()> {
    unitfield::utils::init_logging();
    println!("=== Unitfield Example ===\n");

    // Scalars carry their unit and error through arithmetic
    let air = RealType::new("DemoAirTemp", Some(catalog::kelvin()), false)?;
    let sensor = RealType::new("DemoSensorTemp", Some(catalog::celsius()), false)?;
    let a = Real::new(air.clone(), 290.0).with_error(0.3);
    let b = Real::new(sensor, 12.0).with_error(0.4);
    let mut names = NamePool::new();
    let sum = a.compute(&b, BinaryOp::Add, &mut names, ErrorMode::Independent)?;
    println!("{a} + {b} = {sum}");

    let km = catalog::meter().scale(1000.0)?;
    println!("42 km = {} m\n", catalog::meter().to_this(42.0, &km)?);

    // A 10 x 10 surface stored as one byte per sample
    let plane = RealTupleType::new(vec![
        RealType::new("DemoEast", Some(catalog::meter()), false)?,
        RealType::new("DemoNorth", Some(catalog::meter()), false)?,
    ])?;
    let axis = || Linear1D::new(0.0, 9.0, 10);
    let domain = Arc::new(DomainSet::linear(plane.clone(), vec![axis()?, axis()?])?);
    let ft = FunctionType::new(MathType::RealTuple(plane.clone()), MathType::Real(air))?;
    let field = FlatField::builder(ft, Arc::clone(&domain))
        .discretization(0, Discretization::linear(250.0, 349.0, 100)?)
        .build()?;
    let positions = domain.samples();
    let values: Vec<f64> = (0..domain.length())
        .map(|i| 260.0 + 3.0 * positions[0][i] + positions[1][i])
        .collect();
    field.set_samples(&[values], None)?;
    println!("Field: {field}");
    println!("Storage: {:?}", field.storage_codes());
    println!("Ranges: {:?}\n", field.compute_ranges()?);

    // Refine onto a 19 x 19 lattice
    let fine_axis = || Linear1D::new(0.0, 9.0, 19);
    let fine = Arc::new(DomainSet::linear(plane, vec![fine_axis()?, fine_axis()?])?);
    let refined = field.resample(&fine, SamplingMode::WeightedAverage, ErrorMode::NoErrors)?;
    println!("Refined to {} samples, stored as {:?}", refined.length(), refined.storage_codes());
    println!("Refined sample 20: {:?}", refined.sample(20)?);

    // Gradient along the east axis
    let slope = field.derivative("DemoEast", ErrorMode::NoErrors)?;
    println!(
        "d/dEast at sample 55: {:?} {}",
        slope.sample(55)?,
        unitfield::units::unit_label(slope.range_units()[0].as_ref())
    );

    // Offset units cannot be multiplied
    let c = Real::new(RealType::new("DemoCabin", Some(catalog::celsius()), false)?, 20.0);
    match c.compute(&c, BinaryOp::Multiply, &mut names, ErrorMode::Independent) {
        Ok(r) => println!("unexpected: {r}"),
        Err(e) => println!("\nRejected: {e}"),
    }

    Ok(())
}
