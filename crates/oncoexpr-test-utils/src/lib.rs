//! Shared fixtures for oncoexpr tests.
//!
//! A [`CohortFixture`] is a throwaway directory holding a `quant/` folder of
//! per-sample quantification files and a `results/` folder for artifacts.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Genes of the reference glioblastoma cohort.
pub const GBM_TARGETS: [&str; 3] = ["DLL3", "SEZ6", "CD276"];

/// Per-sample TPMs of the reference cohort. With the default 1.0 threshold
/// the calls are DLL3=[T,T,F,T], SEZ6=[T,F,F,T], CD276=[T,T,T,T]; SEZ6 in
/// sample 02 sits exactly on the threshold. GAPDH is absent from sample 03.
pub const GBM_COHORT: [(&str, &[(&str, f64)]); 4] = [
    (
        "TCGA-GBM-01",
        &[("ACTB", 812.4), ("CD276", 30.0), ("DLL3", 5.0), ("GAPDH", 640.2), ("SEZ6", 2.5)],
    ),
    (
        "TCGA-GBM-02",
        &[("ACTB", 790.0), ("CD276", 22.0), ("DLL3", 3.2), ("GAPDH", 588.7), ("SEZ6", 1.0)],
    ),
    (
        "TCGA-GBM-03",
        &[("ACTB", 845.1), ("CD276", 18.5), ("DLL3", 0.4), ("SEZ6", 0.0)],
    ),
    (
        "TCGA-GBM-04",
        &[("ACTB", 801.9), ("CD276", 41.0), ("DLL3", 12.0), ("GAPDH", 612.3), ("SEZ6", 7.5)],
    ),
];

pub struct CohortFixture {
    root: TempDir,
}

impl CohortFixture {
    /// Empty fixture with `quant/` and `results/` not yet created.
    pub fn new() -> Self {
        Self {
            root: tempfile::tempdir().expect("create fixture tempdir"),
        }
    }

    /// The four-sample reference cohort written to `quant/`.
    pub fn gbm() -> Self {
        let fixture = Self::new();
        for (sample, rows) in GBM_COHORT {
            fixture.add_sample(sample, rows);
        }
        fixture
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.path().join("quant")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.path().join("results")
    }

    /// Write `quant/<sample>.tsv` with a `gene  tpm` header.
    pub fn add_sample(&self, sample: &str, rows: &[(&str, f64)]) -> PathBuf {
        let mut text = String::from("gene\ttpm\n");
        for (gene, tpm) in rows {
            text.push_str(&format!("{gene}\t{tpm}\n"));
        }
        self.write(&format!("quant/{sample}.tsv"), &text)
    }

    /// Write an arbitrary file relative to the fixture root.
    pub fn write(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.root.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create fixture subdirectory");
        }
        fs::write(&path, contents).expect("write fixture file");
        path
    }

    /// Sorted file names currently in `results/`; empty if it does not exist.
    pub fn output_files(&self) -> Vec<String> {
        list_files(&self.output_dir())
    }
}

impl Default for CohortFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Sorted names of the entries in `dir`.
pub fn list_files(dir: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Read a TSV into rows of fields, header included.
pub fn read_tsv(path: &Path) -> Vec<Vec<String>> {
    fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("read {}: {e}", path.display()))
        .lines()
        .map(|l| l.split('\t').map(str::to_string).collect())
        .collect()
}
