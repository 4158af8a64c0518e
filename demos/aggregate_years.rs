use era5land::{Era5Error, Era5LandAggregator, OutputFormat};
use std::env;
use std::path::Path;

#[tokio::main]
async fn main() -> Result<(), Era5Error> {
    configure_polars_display();
    let dataset = Era5LandAggregator::grib()
        .aggregate()
        .input_dir(Path::new("data/grib"))
        .output_dir(Path::new("data/aggregated"))
        .start_year(2009)
        .end_year(2019)
        .format(OutputFormat::Parquet)
        .call()
        .await?;

    println!("{} timestamps", dataset.timestamps()?.len());
    println!("{:#?}", dataset.collect()?);
    Ok(())
}

fn configure_polars_display() {
    // show every column
    env::set_var("POLARS_FMT_MAX_COLS", "-1");
    // show 20 rows
    env::set_var("POLARS_FMT_MAX_ROWS", "20");
}
