//! Regenerates the bundled test file from the bundled vocabulary.
//!
//! With `UPLOAD_TO_STORE=true` the generated test is also written to the
//! remote document store.

use dotenv::dotenv;
use log::{error, info};

use toeic_bot::config::Config;
use toeic_bot::quiz::bundled::TEST_DATA_FILE;
use toeic_bot::quiz::generator::generate_test_document;
use toeic_bot::quiz::remote::upload_test_document;
use toeic_bot::quiz::TEST_ID;
use toeic_bot::vocabulary::VocabularyLoader;

type GenerateResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

#[tokio::main]
async fn main() -> GenerateResult {
    dotenv().ok();
    pretty_env_logger::init();

    let config = Config::from_env()?;
    let assets = config.assets();
    info!("Generating test data from vocabulary in {}", assets.root().display());

    // The sample fallback must never end up in the shipped test file.
    let vocabulary = match VocabularyLoader::new(assets.clone()).load_combined().await {
        Ok(vocabulary) => vocabulary,
        Err(e) => {
            error!("Could not load vocabulary, test data left untouched: {}", e);
            return Err(e.into());
        }
    };
    info!("Loaded {} vocabulary items", vocabulary.len());

    let document = generate_test_document(&vocabulary, &mut rand::thread_rng());
    let json = serde_json::to_string_pretty(&document)?;

    let target = assets.path(TEST_DATA_FILE);
    if let Err(e) = tokio::fs::write(&target, json).await {
        error!("Error saving test data to {}: {}", target.display(), e);
        return Err(e.into());
    }
    info!("Test data saved to {}", target.display());

    if config.upload_to_store {
        let store = config.document_store()?;
        match upload_test_document(&store, TEST_ID, &document).await {
            Ok(count) => info!("Uploaded {} questions to project {}", count, store.project_id()),
            Err(e) => {
                error!("Error uploading test data: {}", e);
                return Err(e.into());
            }
        }
    }

    Ok(())
}
