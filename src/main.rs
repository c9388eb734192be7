use log::{error, info};
use std::env;
use std::error::Error;

use dish_extract::{
    benchmark, catalog, sort_rows, AppConfig, BenchmarkMetric, DishExtractor, ExtractionRequest,
    StdoutSink,
};

const USAGE: &str =
    "Usage: dish-extract [--model ID] [--image PATH] [--bench ID,ID] [DESCRIPTION]";

#[derive(Debug, Default)]
struct Args {
    model: Option<String>,
    image: Option<String>,
    bench: Vec<String>,
    description: Vec<String>,
}

fn parse_args() -> Result<Args, Box<dyn Error>> {
    let mut args = Args::default();
    let mut iter = env::args().skip(1);

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--model" => args.model = Some(iter.next().ok_or("--model needs a model id")?),
            "--image" => args.image = Some(iter.next().ok_or("--image needs a file path")?),
            "--bench" => {
                let list = iter.next().ok_or("--bench needs a comma-separated model list")?;
                args.bench = list
                    .split(',')
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .map(String::from)
                    .collect();
            }
            "-h" | "--help" => return Err(USAGE.into()),
            _ => args.description.push(arg),
        }
    }

    Ok(args)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let args = parse_args()?;
    let config = AppConfig::load()?;
    let description = args.description.join(" ");
    let extractor = DishExtractor::new(config)?;

    if !args.bench.is_empty() {
        let mut rows = benchmark(
            &extractor,
            &description,
            &args.bench,
            extractor.config().default_temperature,
            extractor.config().default_max_tokens,
        )
        .await;

        sort_rows(&mut rows, BenchmarkMetric::Latency, true);
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    let mut builder = ExtractionRequest::builder().description(description);
    if let Some(model) = args.model {
        builder = builder.model(model);
    }
    if let Some(path) = args.image {
        builder = builder.image_file(path);
    }
    let request = builder.build(extractor.config()).await?;

    let label = catalog::display_name(&request.model_id).to_string();
    info!("Extracting with {}", label);

    let mut sink = StdoutSink::default();
    if let Err(e) = extractor.extract_into(&request, &mut sink, &label).await {
        error!("Extraction failed: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
