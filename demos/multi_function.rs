use oscgrid::{
    algorithms::polint::AxisPolicy,
    collections::AbscissaCollection,
    errors::GridError,
    grids::{multi_function::MultiFunction, table_builder::TableBuilder},
    serialization::SerializationFormat,
};
use tracing_subscriber::EnvFilter;

///
/// A 2D table tabulated from a closure, compared against the function
/// between the nodes for increasing interpolation orders.
///
fn tabulated() -> Result<(), GridError>
{
    println!("\nRunning \"tabulated\" example\n");
    let f = |x: &[f64]| (x[0] * 3.0).sin() * (-x[1]).exp();
    let collections = vec![AbscissaCollection::grid(11, 0.0, 1.0)?, AbscissaCollection::grid(6, 0.0, 2.0)?];
    let x = [0.37, 1.13];
    for order in 0..4
    {
        let axis = if order == 0 { AxisPolicy::flat() } else { AxisPolicy::polynomial(order)? };
        let table = MultiFunction::tabulate(vec![axis; 2], collections.clone(), f)?;
        let value = table.evaluate(&x)?;
        println!("order={order}: x={:?}, calculated {value}, expected {}. Error={:e}", x, f(&x), (value - f(&x)).abs());
    }
    Ok(())
}

///
/// A table assembled from scattered rows. The second axis is not evenly
/// spaced, so it is stored as a set of abscissae. Outside the first axis
/// the table clamps; the strict second axis rejects the query.
///
fn from_rows() -> Result<(), GridError>
{
    println!("\nRunning \"from_rows\" example\n");
    let mut builder = TableBuilder::new(vec![AxisPolicy::linear(), AxisPolicy::linear().strict()]);
    let energies = [1.0, 2.0, 5.0, 10.0];
    for i in (0..5).rev()
    {
        let t = i as f64 * 0.25;
        for e in energies
        {
            builder.insert(&[t, e], [t + e, t * e])?;
        }
    }
    let table = builder.compile()?;
    for (axis, collection) in table.collections().iter().enumerate()
    {
        println!("axis {axis}: {collection}");
    }
    println!("f(0.6, 3.5) = {:?}", table.evaluate(&[0.6, 3.5])?);
    println!("f(1.6, 3.5) = {:?} (clamped)", table.evaluate(&[1.6, 3.5])?);
    match table.evaluate(&[0.6, 12.0])
    {
        Ok(value) => println!("f(0.6, 12) = {value:?}"),
        Err(error) => println!("f(0.6, 12) failed: {error}"),
    }

    let path = std::env::temp_dir().join("oscgrid_multi_function.bin");
    table.save(&path, SerializationFormat::BincodeLz4)?;
    let restored = MultiFunction::<[f64; 2]>::load(&path)?;
    println!("restored table from {} equals original: {}", path.display(), restored == table);
    std::fs::remove_file(&path).map_err(GridError::FileIOError)?;
    Ok(())
}

fn main() -> Result<(), GridError>
{
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();
    tabulated()?;
    from_rows()?;
    Ok(())
}
