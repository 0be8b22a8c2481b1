//! The fixed on-disk layout every pipeline stage reads and writes.
//!
//! All paths hang off one data root:
//!
//! ```text
//! <root>/provas/p<yy>.pdf            exam booklet
//! <root>/provas/g<yy>.pdf            official answer key
//! <root>/data/fuvest-<year>.json     per-year dataset
//! <root>/out/<year>/pages/page_NN.png    rendered pages, 1-based
//! <root>/out/audit_crops_<year>.{json,csv}
//! <root>/assets/<year>/qNN/image.png per-question crops
//! <root>/cache/<year>/<purpose>/     content-addressed model responses
//! <root>/locks/enrich-<year>.lock    advisory enrichment lock
//! ```

use std::path::{Path, PathBuf};

/// Path builder for the data root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn exam_pdf(&self, year: u16) -> PathBuf {
        self.root.join("provas").join(format!("p{:02}.pdf", year % 100))
    }

    pub fn answer_key_pdf(&self, year: u16) -> PathBuf {
        self.root.join("provas").join(format!("g{:02}.pdf", year % 100))
    }

    pub fn dataset_path(&self, year: u16) -> PathBuf {
        self.root.join("data").join(format!("fuvest-{year}.json"))
    }

    pub fn pages_dir(&self, year: u16) -> PathBuf {
        self.root.join("out").join(year.to_string()).join("pages")
    }

    /// Rendered page PNG, 1-based page number.
    pub fn page_image(&self, year: u16, page: u32) -> PathBuf {
        self.pages_dir(year).join(format!("page_{page:02}.png"))
    }

    pub fn question_asset(&self, year: u16, number: u8) -> PathBuf {
        self.root
            .join("assets")
            .join(year.to_string())
            .join(format!("q{number:02}"))
            .join("image.png")
    }

    /// The asset path as stored in the dataset (root-relative, forward
    /// slashes).
    pub fn question_asset_ref(&self, year: u16, number: u8) -> String {
        format!("/assets/{year}/q{number:02}/image.png")
    }

    /// Resolve a dataset asset reference back to a filesystem path.
    pub fn resolve_asset_ref(&self, asset_ref: &str) -> PathBuf {
        let mut path = self.root.clone();
        for part in asset_ref.split('/').filter(|p| !p.is_empty()) {
            path.push(part);
        }
        path
    }

    pub fn cache_dir(&self, year: u16, purpose: &str) -> PathBuf {
        self.root.join("cache").join(year.to_string()).join(purpose)
    }

    pub fn lock_path(&self, year: u16) -> PathBuf {
        self.root.join("locks").join(format!("enrich-{year}.lock"))
    }

    pub fn audit_report(&self, year: u16, extension: &str) -> PathBuf {
        self.root
            .join("out")
            .join(format!("audit_crops_{year}.{extension}"))
    }
}
