//! Pathway gene-set libraries.
//!
//! Libraries come from GMT files (`name<TAB>description<TAB>gene…`, one set
//! per line) or from the small oncology library compiled into the binary.

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use oncoexpr_common::{OncoexprError, Result};
use oncoexpr_matrix::io::open_text;
use tracing::debug;

/// One named pathway and its member genes (deduplicated, file order).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathwayGeneSet {
    pub name: String,
    pub description: String,
    pub genes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneSetLibrary {
    name: String,
    sets: Vec<PathwayGeneSet>,
}

// ── Built-in library ────────────────────────────────────────────────────────

const BUILTIN_NAME: &str = "oncoexpr_builtin";

const BUILTIN_SETS: &[(&str, &str, &[&str])] = &[
    (
        "RAS_MAPK_SIGNALING",
        "RAS-RAF-MEK-ERK cascade",
        &[
            "KRAS", "NRAS", "HRAS", "BRAF", "RAF1", "ARAF", "MAP2K1", "MAP2K2", "MAPK1", "MAPK3",
            "SOS1", "GRB2", "NF1", "EGFR", "ERBB2", "SHC1",
        ],
    ),
    (
        "PI3K_AKT_MTOR_SIGNALING",
        "PI3K-AKT-mTOR growth signalling",
        &[
            "PIK3CA", "PIK3CB", "PIK3CD", "PIK3R1", "AKT1", "AKT2", "AKT3", "MTOR", "PTEN",
            "TSC1", "TSC2", "RHEB", "RPTOR", "RICTOR", "PDPK1",
        ],
    ),
    (
        "P53_PATHWAY",
        "p53 stress response",
        &[
            "TP53", "MDM2", "MDM4", "CDKN1A", "BAX", "BBC3", "PMAIP1", "GADD45A", "ATM", "CHEK2",
            "TP53I3", "SESN1",
        ],
    ),
    (
        "CELL_CYCLE_G1_S",
        "G1/S transition control",
        &[
            "CDK4", "CDK6", "CCND1", "CCND2", "CCND3", "CCNE1", "CDK2", "RB1", "E2F1", "E2F2",
            "E2F3", "CDKN2A", "CDKN2B", "CDKN1B",
        ],
    ),
    (
        "NOTCH_SIGNALING",
        "Notch receptors, ligands and targets",
        &[
            "NOTCH1", "NOTCH2", "NOTCH3", "NOTCH4", "DLL1", "DLL3", "DLL4", "JAG1", "JAG2", "HES1",
            "HEY1", "RBPJ", "MAML1", "ADAM10", "NUMB",
        ],
    ),
    (
        "WNT_BETA_CATENIN",
        "Canonical Wnt signalling",
        &[
            "CTNNB1", "APC", "AXIN1", "AXIN2", "GSK3B", "LRP5", "LRP6", "FZD1", "WNT1", "WNT3A",
            "TCF7", "LEF1", "MYC",
        ],
    ),
    (
        "IMMUNE_CHECKPOINT",
        "Inhibitory immune checkpoints and ligands",
        &[
            "CD274", "PDCD1LG2", "PDCD1", "CTLA4", "CD80", "CD86", "LAG3", "HAVCR2", "TIGIT",
            "CD276", "VTCN1", "IDO1",
        ],
    ),
    (
        "NEUROENDOCRINE_DIFFERENTIATION",
        "Neuroendocrine lineage markers",
        &[
            "ASCL1", "NEUROD1", "INSM1", "CHGA", "SYP", "NCAM1", "DLL3", "SEZ6", "ENO2", "POU2F3",
        ],
    ),
    (
        "DNA_REPAIR_HOMOLOGOUS_RECOMBINATION",
        "Homologous recombination repair",
        &[
            "BRCA1", "BRCA2", "PALB2", "RAD51", "RAD51C", "RAD51D", "ATM", "ATR", "CHEK1", "CHEK2",
            "BARD1", "BRIP1", "MRE11", "NBN", "RAD50",
        ],
    ),
    (
        "JAK_STAT_SIGNALING",
        "Cytokine JAK-STAT signalling",
        &[
            "JAK1", "JAK2", "JAK3", "TYK2", "STAT1", "STAT3", "STAT5A", "STAT5B", "SOCS1", "SOCS3",
            "IL6", "IL6ST",
        ],
    ),
    (
        "ANGIOGENESIS_VEGF",
        "VEGF/PDGF/angiopoietin angiogenic signalling",
        &[
            "VEGFA", "VEGFB", "VEGFC", "KDR", "FLT1", "FLT4", "NRP1", "PDGFA", "PDGFB", "PDGFRB",
            "ANGPT1", "ANGPT2", "TEK",
        ],
    ),
    (
        "APOPTOSIS",
        "Intrinsic and extrinsic apoptosis",
        &[
            "BCL2", "BCL2L1", "MCL1", "BAX", "BAK1", "BID", "CASP3", "CASP8", "CASP9", "CYCS",
            "APAF1", "XIAP", "FAS", "FADD",
        ],
    ),
];

impl GeneSetLibrary {
    /// The compiled-in oncology pathway library.
    pub fn builtin() -> Self {
        let sets = BUILTIN_SETS
            .iter()
            .map(|(name, description, genes)| PathwayGeneSet {
                name: name.to_string(),
                description: description.to_string(),
                genes: genes.iter().map(|g| g.to_string()).collect(),
            })
            .collect();
        Self {
            name: BUILTIN_NAME.to_string(),
            sets,
        }
    }

    /// Load a GMT file (plain or `.gz`).
    pub fn from_gmt(path: &Path) -> Result<Self> {
        let mut text = String::new();
        open_text(path)?
            .read_to_string(&mut text)
            .map_err(|e| OncoexprError::io(path, e))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "gene_sets".to_string());
        Self::parse_gmt(&name, &text).map_err(|e| match e {
            OncoexprError::Input(msg) => OncoexprError::input(format!("{}: {msg}", path.display())),
            other => other,
        })
    }

    /// Parse GMT text. Blank lines and `#` comments are skipped.
    pub fn parse_gmt(name: &str, text: &str) -> Result<Self> {
        let mut sets = Vec::new();
        let mut names = HashSet::new();

        for (lineno, line) in text.lines().enumerate() {
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() < 3 {
                return Err(OncoexprError::input(format!(
                    "line {}: expected name, description and at least one gene",
                    lineno + 1
                )));
            }
            let set_name = fields[0].trim();
            if set_name.is_empty() {
                return Err(OncoexprError::input(format!("line {}: empty set name", lineno + 1)));
            }
            if !names.insert(set_name.to_string()) {
                return Err(OncoexprError::input(format!(
                    "line {}: gene set {set_name} defined twice",
                    lineno + 1
                )));
            }

            let mut seen = HashSet::new();
            let genes: Vec<String> = fields[2..]
                .iter()
                .map(|g| g.trim())
                .filter(|g| !g.is_empty() && seen.insert(*g))
                .map(str::to_string)
                .collect();
            if genes.is_empty() {
                return Err(OncoexprError::input(format!(
                    "line {}: gene set {set_name} has no genes",
                    lineno + 1
                )));
            }

            sets.push(PathwayGeneSet {
                name: set_name.to_string(),
                description: fields[1].trim().to_string(),
                genes,
            });
        }

        if sets.is_empty() {
            return Err(OncoexprError::input("no gene sets defined"));
        }
        debug!(library = name, n_sets = sets.len(), "Parsed gene set library");
        Ok(Self {
            name: name.to_string(),
            sets,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sets(&self) -> &[PathwayGeneSet] {
        &self.sets
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oncoexpr_common::ErrorKind;

    #[test]
    fn test_builtin_library_is_well_formed() {
        let lib = GeneSetLibrary::builtin();
        assert_eq!(lib.name(), "oncoexpr_builtin");
        assert!(lib.len() >= 10);
        let mut names = HashSet::new();
        for set in lib.sets() {
            assert!(names.insert(set.name.clone()), "duplicate {}", set.name);
            let unique: HashSet<_> = set.genes.iter().collect();
            assert_eq!(unique.len(), set.genes.len(), "repeated gene in {}", set.name);
        }
    }

    #[test]
    fn test_parse_gmt() {
        let text = "# custom\nHALLMARK_A\tdesc a\tDLL3\tSEZ6\tDLL3\n\nHALLMARK_B\thttp://x\tKRAS\n";
        let lib = GeneSetLibrary::parse_gmt("custom.gmt", text).unwrap();
        assert_eq!(lib.len(), 2);
        assert_eq!(lib.sets()[0].genes, vec!["DLL3", "SEZ6"]);
        assert_eq!(lib.sets()[1].description, "http://x");
    }

    #[test]
    fn test_parse_gmt_rejects_short_line() {
        let err = GeneSetLibrary::parse_gmt("x", "ONLY_NAME\tdesc\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Input);
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn test_parse_gmt_rejects_duplicate_set() {
        let err = GeneSetLibrary::parse_gmt("x", "A\td\tG1\nA\td\tG2\n").unwrap_err();
        assert!(err.to_string().contains("defined twice"));
    }

    #[test]
    fn test_from_gmt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sets.gmt");
        std::fs::write(&path, "SET1\tna\tA\tB\tC\n").unwrap();
        let lib = GeneSetLibrary::from_gmt(&path).unwrap();
        assert_eq!(lib.name(), "sets.gmt");
        assert_eq!(lib.sets()[0].genes.len(), 3);
    }

    #[test]
    fn test_empty_gmt_is_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.gmt");
        std::fs::write(&path, "\n# nothing\n").unwrap();
        assert_eq!(
            GeneSetLibrary::from_gmt(&path).unwrap_err().kind(),
            ErrorKind::Input
        );
    }
}
