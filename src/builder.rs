use log::debug;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use crate::catalog;
use crate::config::AppConfig;
use crate::error::ExtractError;
use crate::model::SchemaPolicy;
use crate::prompt::{ImageInput, PromptInput, PromptVersion};

pub const TEMPERATURE_RANGE: RangeInclusive<f64> = 0.0..=1.0;
pub const MAX_TOKENS_RANGE: RangeInclusive<u32> = 64..=4096;

/// A fully resolved, validated extraction request
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionRequest {
    /// Dish description, or an optional hint when an image is attached
    pub description: String,
    pub image: Option<ImageInput>,
    pub model_id: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub prompt_version: PromptVersion,
    pub schema_policy: SchemaPolicy,
}

impl ExtractionRequest {
    /// Creates a new builder for extraction requests
    ///
    /// # Example
    /// ```
    /// use dish_extract::ExtractionRequest;
    ///
    /// let builder = ExtractionRequest::builder().description("Phở bò tái chín");
    /// ```
    pub fn builder() -> ExtractionRequestBuilder {
        ExtractionRequestBuilder::default()
    }

    /// View handed to the prompt builder
    pub fn prompt_input(&self) -> PromptInput<'_> {
        PromptInput {
            description: &self.description,
            image: self.image.as_ref(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

/// Where the image of an image request comes from
#[derive(Debug, Clone)]
enum ImageSource {
    Bytes(ImageInput),
    File(PathBuf),
}

/// Builder for [`ExtractionRequest`]; unset fields fall back to [`AppConfig`]
#[derive(Debug, Default, Clone)]
pub struct ExtractionRequestBuilder {
    description: Option<String>,
    image: Option<ImageSource>,
    model_id: Option<String>,
    temperature: Option<f64>,
    max_tokens: Option<u32>,
    prompt_version: Option<PromptVersion>,
    schema_policy: Option<SchemaPolicy>,
}

impl ExtractionRequestBuilder {
    /// Set the free-text dish description
    ///
    /// With an image attached, the description becomes an optional hint.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Attach image bytes with their MIME type
    ///
    /// # Example
    /// ```
    /// use dish_extract::{ExtractionRequest, ImageInput};
    ///
    /// let builder = ExtractionRequest::builder()
    ///     .image(ImageInput::new(vec![0x89, 0x50, 0x4e, 0x47], "image/png"));
    /// ```
    pub fn image(mut self, image: ImageInput) -> Self {
        self.image = Some(ImageSource::Bytes(image));
        self
    }

    /// Attach an image file; the MIME type is guessed from its extension
    pub fn image_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.image = Some(ImageSource::File(path.into()));
        self
    }

    pub fn model(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = Some(model_id.into());
        self
    }

    /// Sampling temperature, must lie in [0, 1]
    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Output token limit, must lie in [64, 4096]
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn prompt_version(mut self, version: PromptVersion) -> Self {
        self.prompt_version = Some(version);
        self
    }

    pub fn schema_policy(mut self, policy: SchemaPolicy) -> Self {
        self.schema_policy = Some(policy);
        self
    }

    /// Validate the parameters and resolve defaults from `config`
    ///
    /// # Errors
    /// Returns `ExtractError::InvalidInput` if:
    /// - neither a description nor an image was given
    /// - temperature or max tokens are out of range
    /// - the model id is blank
    ///
    /// Reading an image file can fail with `ExtractError::Io`.
    ///
    /// # Example
    /// ```
    /// use dish_extract::{AppConfig, ExtractionRequest};
    ///
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let request = ExtractionRequest::builder()
    ///     .description("Bún chả Hà Nội")
    ///     .temperature(0.3)
    ///     .build(&AppConfig::default())
    ///     .await?;
    /// assert_eq!(request.max_tokens, 1024);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn build(self, config: &AppConfig) -> Result<ExtractionRequest, ExtractError> {
        let image = match self.image {
            Some(ImageSource::Bytes(image)) => Some(image),
            Some(ImageSource::File(path)) => Some(load_image(&path).await?),
            None => None,
        };

        let description = self.description.unwrap_or_default().trim().to_string();
        match &image {
            None if description.is_empty() => {
                return Err(ExtractError::InvalidInput(
                    "Description cannot be empty without an image".to_string(),
                ))
            }
            Some(image) if image.bytes.is_empty() => {
                return Err(ExtractError::InvalidInput("Image is empty".to_string()))
            }
            _ => {}
        }

        let model_id = self
            .model_id
            .unwrap_or_else(|| config.default_model_id.clone())
            .trim()
            .to_string();
        if model_id.is_empty() {
            return Err(ExtractError::InvalidInput(
                "Model id cannot be empty".to_string(),
            ));
        }

        let temperature = self.temperature.unwrap_or(config.default_temperature);
        if !TEMPERATURE_RANGE.contains(&temperature) {
            return Err(ExtractError::InvalidInput(format!(
                "Temperature {} is outside [0, 1]",
                temperature
            )));
        }

        let max_tokens = self
            .max_tokens
            .unwrap_or_else(|| catalog::default_max_tokens(&model_id, config.default_max_tokens));
        if !MAX_TOKENS_RANGE.contains(&max_tokens) {
            return Err(ExtractError::InvalidInput(format!(
                "Max tokens {} is outside [64, 4096]",
                max_tokens
            )));
        }

        Ok(ExtractionRequest {
            description,
            image,
            model_id,
            temperature,
            max_tokens,
            prompt_version: self.prompt_version.unwrap_or(config.prompt_version),
            schema_policy: self.schema_policy.unwrap_or(config.schema_policy),
        })
    }
}

/// Read an image file, guessing its MIME type from the extension
pub async fn load_image(path: &Path) -> Result<ImageInput, ExtractError> {
    let bytes = tokio::fs::read(path).await?;
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    debug!("Loaded image {} ({} bytes, {})", path.display(), bytes.len(), mime);
    Ok(ImageInput::new(bytes, mime.essence_str()))
}
