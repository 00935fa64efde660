//! Species list output for the `species` command.

use crate::config::{Config, get_model};
use crate::error::{Error, Result};
use crate::inference::{CategoryList, display_name, load_categories};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::info;

/// Print or write the species a model recognizes, sorted by display name.
///
/// The labels file is taken from `labels`, else from the named model, else
/// from the configured default model.
///
/// # Errors
/// Returns an error if no labels file can be resolved or read, or the
/// output cannot be written.
pub fn list_species(
    config: &Config,
    model: Option<String>,
    labels: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<()> {
    let labels_path = match labels {
        Some(path) => path,
        None => {
            let name = model
                .or_else(|| config.defaults.model.clone())
                .ok_or_else(|| Error::ConfigValidation {
                    message: "no model specified (use -m, --labels or set defaults.model in config)"
                        .to_string(),
                })?;
            get_model(config, &name)?.labels.clone()
        }
    };

    if !labels_path.exists() {
        return Err(Error::LabelsFileNotFound { path: labels_path });
    }

    let categories = load_categories(&labels_path)?;
    info!(
        "Loaded {} categories from {}",
        categories.len(),
        labels_path.display()
    );

    match output {
        Some(path) => {
            let file = File::create(&path)?;
            write_species(BufWriter::new(file), &categories)?;
            info!("Species list written to: {}", path.display());
        }
        None => write_species(std::io::stdout().lock(), &categories)?,
    }

    Ok(())
}

/// One `Display Name<TAB>label` line per non-blank category.
fn write_species<W: Write>(mut out: W, categories: &CategoryList) -> Result<()> {
    for label in categories.sorted_by_display_name() {
        if label.trim().is_empty() {
            continue;
        }
        writeln!(out, "{}\t{label}", display_name(label))?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;

    #[test]
    fn test_write_species_sorted_by_display_name() {
        let categories = CategoryList::parse("wren\nblue_tit\n\nbarn_owl\n");
        let mut out = Vec::new();
        write_species(&mut out, &categories).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "Barn Owl\tbarn_owl\nBlue Tit\tblue_tit\nWren\twren\n"
        );
    }

    #[test]
    fn test_list_species_from_configured_model() {
        let dir = tempfile::tempdir().unwrap();
        let labels = dir.path().join("labels.txt");
        std::fs::write(&labels, "robin\nchaffinch\n").unwrap();
        let output = dir.path().join("species.txt");

        let mut config = Config::default();
        config.models.insert(
            "garden".to_string(),
            ModelConfig {
                path: dir.path().join("birds.onnx"),
                labels,
                input_size: 224,
                batch_size: 1,
            },
        );
        config.defaults.model = Some("garden".to_string());

        list_species(&config, None, None, Some(output.clone())).unwrap();
        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            "Chaffinch\tchaffinch\nRobin\trobin\n"
        );
    }

    #[test]
    fn test_list_species_without_model_is_config_error() {
        let result = list_species(&Config::default(), None, None, None);
        assert!(matches!(result, Err(Error::ConfigValidation { .. })));
    }

    #[test]
    fn test_list_species_missing_labels_file() {
        let result = list_species(
            &Config::default(),
            None,
            Some(PathBuf::from("/nonexistent/labels.txt")),
            None,
        );
        assert!(matches!(result, Err(Error::LabelsFileNotFound { .. })));
    }
}
