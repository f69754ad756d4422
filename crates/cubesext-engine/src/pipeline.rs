//! End-to-end model build: read the schema, infer, export

use crate::document::ModelDocument;
use crate::export::{export_model, ExportError};
use crate::inference::{InferenceEngine, InferenceError, InferenceResult};
use cubesext_catalog::{connect, ReadError, SchemaReader};
use cubesext_core::{InferenceConfig, Report};
use std::path::{Path, PathBuf};

/// Any failure of the build; nothing is written unless every stage succeeds
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Read(#[from] ReadError),

    #[error(transparent)]
    Inference(#[from] InferenceError),

    #[error(transparent)]
    Export(#[from] ExportError),
}

/// Everything one build produced
#[derive(Debug, Clone)]
pub struct ModelBuild {
    pub document: ModelDocument,

    /// Where the document was written
    pub path: PathBuf,

    pub result: InferenceResult,

    /// Number of tables read from the source
    pub tables: usize,
}

impl ModelBuild {
    /// Inference report for this build
    pub fn report(&self) -> Report {
        let mut report = Report::from_diagnostics(self.result.diagnostics.clone())
            .with_model_path(self.path.display().to_string());
        report.summary = self.result.summary(self.tables);
        report
    }
}

/// Build and write a model from an open schema reader
pub fn build_model(
    reader: &dyn SchemaReader,
    options: &InferenceConfig,
    output: Option<&Path>,
) -> Result<ModelBuild, PipelineError> {
    let catalog = reader.read_catalog(options)?;
    tracing::info!(reader = reader.name(), tables = catalog.len(), "schema read");

    let result = InferenceEngine::with_options(options.clone())?.infer(&catalog)?;
    let (document, path) = export_model(&result, output)?;

    Ok(ModelBuild {
        document,
        path,
        result,
        tables: catalog.len(),
    })
}

/// Build and write a model for a database URL
pub fn sql_to_cubes(
    db_url: &str,
    options: &InferenceConfig,
    output: Option<&Path>,
) -> Result<ModelBuild, PipelineError> {
    let reader = connect(db_url)?;
    build_model(reader.as_ref(), options, output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cubesext_catalog::MockReader;
    use cubesext_core::{Column, Table};

    #[test]
    fn failed_inference_writes_nothing() {
        let reader = MockReader::from_tables(vec![Table::new(
            "t",
            vec![Column::new("id", "DATETIME").primary_key()],
        )]);
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("model.json");

        let err = build_model(&reader, &InferenceConfig::default(), Some(&output)).unwrap_err();
        assert!(matches!(err, PipelineError::Inference(InferenceError::UnsupportedType { .. })));
        assert!(!output.exists());
    }

    #[test]
    fn read_errors_propagate() {
        let reader = MockReader::new().with_connection_failure();
        let err = build_model(&reader, &InferenceConfig::default(), None).unwrap_err();
        assert!(matches!(err, PipelineError::Read(ReadError::Connection(_))));
    }

    #[test]
    fn report_carries_counts() {
        let reader = MockReader::from_tables(vec![Table::new(
            "t",
            vec![
                Column::new("id", "INTEGER").primary_key(),
                Column::new("v", "REAL"),
                Column::new("blob", "BLOB"),
            ],
        )]);
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("model.json");

        let build = build_model(&reader, &InferenceConfig::default(), Some(&output)).unwrap();
        let report = build.report();

        assert_eq!(report.summary.tables, 1);
        assert_eq!(report.summary.facts, 1);
        assert_eq!(report.summary.measures, 1);
        assert_eq!(report.summary.dropped_columns, 1);
        assert_eq!(report.model_path.as_deref(), Some(output.display().to_string().as_str()));
    }
}
