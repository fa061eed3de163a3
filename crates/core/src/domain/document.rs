use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    PurchaseAgreement,
    EnergyLabel,
    InspectionReport,
    HoaDocuments,
    PropertyListing,
    Other,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::PurchaseAgreement => "purchase_agreement",
            DocumentType::EnergyLabel => "energy_label",
            DocumentType::InspectionReport => "inspection_report",
            DocumentType::HoaDocuments => "hoa_documents",
            DocumentType::PropertyListing => "property_listing",
            DocumentType::Other => "other",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "purchase_agreement" => Ok(DocumentType::PurchaseAgreement),
            "energy_label" => Ok(DocumentType::EnergyLabel),
            "inspection_report" => Ok(DocumentType::InspectionReport),
            "hoa_documents" => Ok(DocumentType::HoaDocuments),
            "property_listing" => Ok(DocumentType::PropertyListing),
            "other" => Ok(DocumentType::Other),
            other => anyhow::bail!("unknown document type: {other}"),
        }
    }
}

/// A document already uploaded for a session. Text extraction happens
/// upstream; a document without extracted text is skipped by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDocument {
    pub id: Uuid,
    pub filename: String,
    pub extracted_text: Option<String>,
    pub document_type: Option<DocumentType>,
}
