//! Prompt text and tool schemas shared by the AI gateway implementations.

use serde_json::json;

pub const CLASSIFY_MAX_CHARS: usize = 3000;
pub const EXTRACT_MAX_CHARS: usize = 8000;
pub const RISKS_MAX_CHARS: usize = 8000;
pub const STRENGTHS_MAX_CHARS: usize = 6000;

/// A provider-neutral tool definition; each gateway adapts it to its own
/// wire format.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: serde_json::Value,
}

pub fn classify_prompt(text: &str) -> String {
    format!(
        "You are a Dutch real estate document classifier. Classify the following text \
         extracted from a PDF into one of these document types:\n\
         \n\
         - purchase_agreement: koopovereenkomst / koopakte\n\
         - energy_label: energielabel certificate\n\
         - inspection_report: bouwkundig rapport / bouwtechnische keuring\n\
         - hoa_documents: VvE stukken (splitsingsakte, jaarrekening, MJOP)\n\
         - property_listing: brochure / funda listing\n\
         - other: any other document type\n\
         \n\
         Return ONLY the document type string, nothing else.\n\
         \n\
         Document text:\n{text}"
    )
}

pub fn extract_property_data_prompt(doc_type: &str, text: &str) -> String {
    format!(
        "You are an expert Dutch real estate document analyzer. Extract all structured \
         property data from the following {doc_type} document.\n\
         \n\
         Rules:\n\
         - Only extract data that is explicitly stated in the document; omit fields you \
           cannot find.\n\
         - All prices in euros, numbers only.\n\
         - Postal codes in the format \"1234 AB\".\n\
         - square_meters is the woonoppervlakte (living area), not the plot.\n\
         \n\
         Document text:\n{text}"
    )
}

pub fn extract_property_data_tool() -> ToolSpec {
    ToolSpec {
        name: "extract_property_data",
        description: "Extract structured property data from a Dutch real estate document",
        input_schema: json!({
            "type": "object",
            "properties": {
                "address": {"type": "string", "description": "Street address (straat + huisnummer)"},
                "postal_code": {"type": "string", "description": "Dutch postal code, e.g. 1234 AB"},
                "city": {"type": "string", "description": "City or municipality name"},
                "square_meters": {"type": "number", "description": "Living area in square meters"},
                "year_built": {"type": "integer", "description": "Construction year (bouwjaar)"},
                "energy_label": {"type": "string", "description": "Energy label (A++++ to G)"},
                "property_type": {"type": "string", "description": "appartement, tussenwoning, vrijstaand, etc."},
                "asking_price": {"type": "number", "description": "Asking price in euros (vraagprijs)"},
                "hoa_monthly_cost": {"type": "number", "description": "Monthly VvE contribution in euros"},
                "num_rooms": {"type": "integer", "description": "Number of rooms (kamers)"},
                "has_garden": {"type": "boolean"},
                "has_parking": {"type": "boolean"},
                "conditions": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Special clauses (ontbindende voorwaarden, bijzondere bepalingen)"
                },
                "transfer_date": {"type": "string", "description": "Planned transfer date (leveringsdatum)"}
            }
        }),
    }
}

pub fn detect_risks_prompt(doc_type: &str, text: &str) -> String {
    format!(
        "You are an expert Dutch real estate risk assessor. Analyze the following {doc_type} \
         document and identify ALL potential risks for a home buyer.\n\
         \n\
         Risk categories:\n\
         - structural: foundation issues (funderingsproblemen), roof, moisture, asbestos, \
           concrete rot (betonrot), outdated installations, poor insulation\n\
         - legal: erfpacht conditions, VvE issues, zoning (bestemmingsplan), easements, \
           monument status, pending permits, unusual contract clauses\n\
         - financial: price above market, high VvE fees, poor energy label, required \
           renovations, upcoming special assessments\n\
         - market: area decline, long time on market, local price trends\n\
         \n\
         Be thorough but fair; only flag genuine concerns.\n\
         \n\
         Document text:\n{text}"
    )
}

pub fn detect_risks_tool() -> ToolSpec {
    ToolSpec {
        name: "detect_risks",
        description: "Detect risks and issues in a Dutch real estate document",
        input_schema: json!({
            "type": "object",
            "properties": {
                "risks": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "category": {
                                "type": "string",
                                "enum": ["structural", "legal", "financial", "market"],
                                "description": "Risk category"
                            },
                            "severity": {
                                "type": "string",
                                "enum": ["low", "medium", "high", "critical"],
                                "description": "Severity level"
                            },
                            "title": {"type": "string", "description": "Short risk title"},
                            "description": {
                                "type": "string",
                                "description": "Explanation of the risk and its potential impact"
                            }
                        },
                        "required": ["category", "severity", "title", "description"]
                    }
                }
            },
            "required": ["risks"]
        }),
    }
}

pub fn strengths_weaknesses_prompt(property_data: &serde_json::Value, text: &str) -> String {
    format!(
        "You are an expert Dutch real estate advisor. Based on the document text and the \
         extracted property data, identify the key strengths and weaknesses of this property \
         for a potential buyer. Consider location, building condition, energy efficiency, \
         price relative to market, VvE situation, outdoor space and future value. Each item \
         should be one concise sentence.\n\
         \n\
         Property data:\n{property_data}\n\
         \n\
         Document text:\n{text}"
    )
}

pub fn strengths_weaknesses_tool() -> ToolSpec {
    ToolSpec {
        name: "identify_strengths_weaknesses",
        description: "Identify property strengths and weaknesses for a Dutch home buyer",
        input_schema: json!({
            "type": "object",
            "properties": {
                "strengths": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Property strengths and positive aspects"
                },
                "weaknesses": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Property weaknesses and concerns"
                }
            },
            "required": ["strengths", "weaknesses"]
        }),
    }
}
