use era5land::{BoundingBox, Era5LandFetcher, FetchError, Month};
use std::path::Path;

#[tokio::main]
async fn main() -> Result<(), FetchError> {
    let fetcher = Era5LandFetcher::from_env()?;
    // Europe, roughly
    let europe = BoundingBox::new(72.0, -25.0, 34.0, 45.0)?;

    let files = fetcher
        .download()
        .directory(Path::new("data/grib"))
        .start(Month(2019, 1))
        .end(Month(2019, 1))
        .variables(vec![
            "2m_temperature".to_string(),
            "total_precipitation".to_string(),
        ])
        .area(europe)
        .call()
        .await?;

    for file in files {
        println!("{}", file.display());
    }
    Ok(())
}
