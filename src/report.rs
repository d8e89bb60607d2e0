use std::any::TypeId;
use std::cell::RefCell;
use std::fs::{create_dir_all, File};
use std::path::PathBuf;

use csv::Writer;
use log::{error, trace};

use crate::context::Context;
use crate::error::SimError;
use crate::{HashMap, HashMapExt};

pub trait Report: 'static {
    // Returns report type
    fn type_id(&self) -> TypeId;
    // Serializes the data with the correct writer
    fn serialize(&self, writer: &mut Writer<File>) -> Result<(), csv::Error>;
}

/// Use this macro to define a unique report type
#[macro_export]
macro_rules! define_report {
    ($name:ident) => {
        impl $crate::report::Report for $name {
            fn type_id(&self) -> std::any::TypeId {
                std::any::TypeId::of::<$name>()
            }

            fn serialize(
                &self,
                writer: &mut $crate::csv::Writer<std::fs::File>,
            ) -> Result<(), $crate::csv::Error> {
                writer.serialize(self)
            }
        }
    };
}
pub use define_report;

/// Where report files go: `<directory>/<file_prefix><short_name>.csv`.
pub struct ReportOptions {
    file_prefix: String,
    directory: PathBuf,
    overwrite: bool,
}

impl ReportOptions {
    /// Sets the prefix put in front of every report's short name.
    pub fn file_prefix(&mut self, file_prefix: String) -> &mut ReportOptions {
        self.file_prefix = file_prefix;
        self
    }

    /// Sets the output directory. It is created when the first report is
    /// added.
    pub fn directory(&mut self, directory: PathBuf) -> &mut ReportOptions {
        self.directory = directory;
        self
    }

    /// Allows existing report files to be replaced.
    pub fn overwrite(&mut self, overwrite: bool) -> &mut ReportOptions {
        self.overwrite = overwrite;
        self
    }
}

impl Default for ReportOptions {
    fn default() -> Self {
        ReportOptions {
            file_prefix: String::new(),
            directory: PathBuf::from("."),
            overwrite: false,
        }
    }
}

struct ReportData {
    file_writers: RefCell<HashMap<TypeId, Writer<File>>>,
    config: ReportOptions,
}

// Registers a data container that stores
// * file_writers: Maps report type to file writer
// * config: Contains all the customizable filename options that the user supplies
crate::context::define_data_plugin!(
    ReportPlugin,
    ReportData,
    ReportData {
        file_writers: RefCell::new(HashMap::new()),
        config: ReportOptions::default(),
    }
);

pub trait ContextReportExt {
    /// Returns the options used by subsequent `add_report` calls.
    fn report_options(&mut self) -> &mut ReportOptions;

    /// Call `add_report` with each report type, passing a short name for the
    /// file. The report is written to
    /// `<directory>/<file_prefix><short_name>.csv`.
    ///
    /// # Errors
    ///
    /// * `SimError::ReportError` if the file exists and overwriting is off.
    /// * `SimError::IoError` if the directory or file cannot be created.
    fn add_report<T: Report>(&mut self, short_name: &str) -> Result<(), SimError>;

    /// Write a new row with columns following items in the report struct
    /// to the report file associated with the report type struct.
    ///
    /// # Panics
    ///
    /// Panics if no report of this type was added.
    fn send_report<T: Report>(&self, report: T);
}

impl ContextReportExt for Context {
    fn report_options(&mut self) -> &mut ReportOptions {
        &mut self.get_data_mut(ReportPlugin).config
    }

    fn add_report<T: Report>(&mut self, short_name: &str) -> Result<(), SimError> {
        let data_container = self.get_data_mut(ReportPlugin);
        let config = &data_container.config;
        let path = config
            .directory
            .join(format!("{}{short_name}.csv", config.file_prefix));
        if path.exists() && !config.overwrite {
            error!("report file {} already exists", path.display());
            return Err(SimError::ReportError(format!(
                "{} already exists; enable overwrite to replace it",
                path.display()
            )));
        }
        create_dir_all(&config.directory)?;
        let file = File::create(&path)?;
        trace!("writing report {short_name} to {}", path.display());

        data_container
            .file_writers
            .borrow_mut()
            .insert(TypeId::of::<T>(), Writer::from_writer(file));
        Ok(())
    }

    fn send_report<T: Report>(&self, report: T) {
        // No data container will exist if no reports have been added
        let data_container = self
            .get_data(ReportPlugin)
            .expect("No writer found for the report type");
        let mut writers = data_container.file_writers.borrow_mut();
        let writer = writers
            .get_mut(&report.type_id())
            .expect("No writer found for the report type");
        let result = report
            .serialize(writer)
            .and_then(|()| writer.flush().map_err(csv::Error::from));
        if let Err(err) = result {
            error!("failed to write report row: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};
    use tempfile::tempdir;

    use super::*;

    #[derive(Serialize, Deserialize)]
    struct SampleReport {
        id: u32,
        value: String,
    }

    define_report!(SampleReport);

    #[test]
    fn add_and_send_report() {
        let mut context = Context::new();
        let temp_dir = tempdir().unwrap();
        context
            .report_options()
            .directory(temp_dir.path().to_path_buf());
        context.add_report::<SampleReport>("sample").unwrap();
        context.send_report(SampleReport {
            id: 1,
            value: "Value,1".to_string(),
        });
        context.send_report(SampleReport {
            id: 2,
            value: "Value\n2".to_string(),
        });

        let file_path = temp_dir.path().join("sample.csv");
        let mut reader = csv::Reader::from_path(file_path).unwrap();
        let records: Vec<SampleReport> = reader.deserialize().map(Result::unwrap).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, 1);
        assert_eq!(records[0].value, "Value,1");
        assert_eq!(records[1].value, "Value\n2");
    }

    #[test]
    fn prefix_and_nested_directory() {
        let mut context = Context::new();
        let temp_dir = tempdir().unwrap();
        let directory = temp_dir.path().join("nested").join("out");
        context
            .report_options()
            .directory(directory.clone())
            .file_prefix("run1_".to_string());
        context.add_report::<SampleReport>("sample").unwrap();
        assert!(directory.join("run1_sample.csv").exists());
    }

    #[test]
    fn existing_file_needs_overwrite() {
        let mut context = Context::new();
        let temp_dir = tempdir().unwrap();
        std::fs::write(temp_dir.path().join("sample.csv"), "old").unwrap();
        context
            .report_options()
            .directory(temp_dir.path().to_path_buf());
        assert!(matches!(
            context.add_report::<SampleReport>("sample"),
            Err(SimError::ReportError(_))
        ));

        context.report_options().overwrite(true);
        context.add_report::<SampleReport>("sample").unwrap();
    }

    #[test]
    #[should_panic(expected = "No writer found for the report type")]
    fn send_report_without_adding_report() {
        let context = Context::new();
        context.send_report(SampleReport {
            id: 1,
            value: "Test Value".to_string(),
        });
    }
}
