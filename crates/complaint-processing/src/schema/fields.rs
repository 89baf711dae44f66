//! Semantic fields and the declarative candidate tables used to find them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A field the pipeline understands, independent of how a given file
/// happens to spell its header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticField {
    CaseNumber,
    OpenedAt,
    LocationCode,
    StoreResponse,
    QualityFinding,
    Status,
    ProductId,
    Category,
    SubType,
    Lot,
    ExpirationDate,
    Description,
    Supplier,
}

impl SemanticField {
    /// Every complaint-side field, in canonical column order.
    pub const ALL: [SemanticField; 13] = [
        SemanticField::CaseNumber,
        SemanticField::OpenedAt,
        SemanticField::LocationCode,
        SemanticField::StoreResponse,
        SemanticField::QualityFinding,
        SemanticField::Status,
        SemanticField::ProductId,
        SemanticField::Category,
        SemanticField::SubType,
        SemanticField::Lot,
        SemanticField::ExpirationDate,
        SemanticField::Description,
        SemanticField::Supplier,
    ];

    /// Header used for this field in the unified table and in exports.
    pub fn canonical_name(&self) -> &'static str {
        match self {
            Self::CaseNumber => "Número del caso",
            Self::OpenedAt => "Fecha/hora de apertura",
            Self::LocationCode => "Código de sucursal",
            Self::StoreResponse => "Respuesta tienda",
            Self::QualityFinding => "Definición equipo calidad",
            Self::Status => "Estado",
            Self::ProductId => "EAN",
            Self::Category => "Categoría",
            Self::SubType => "Subtipo",
            Self::Lot => "Lote nro.",
            Self::ExpirationDate => "Fecha de vencimiento",
            Self::Description => "Descripción",
            Self::Supplier => "Razón social",
        }
    }

    /// Stable machine key, identical to the serde representation.
    pub fn key(&self) -> &'static str {
        match self {
            Self::CaseNumber => "case_number",
            Self::OpenedAt => "opened_at",
            Self::LocationCode => "location_code",
            Self::StoreResponse => "store_response",
            Self::QualityFinding => "quality_finding",
            Self::Status => "status",
            Self::ProductId => "product_id",
            Self::Category => "category",
            Self::SubType => "sub_type",
            Self::Lot => "lot",
            Self::ExpirationDate => "expiration_date",
            Self::Description => "description",
            Self::Supplier => "supplier",
        }
    }

    /// Accepted header spellings, highest priority first.
    pub fn candidates(&self) -> &'static [&'static str] {
        match self {
            Self::CaseNumber => &[
                "número del caso",
                "numero de caso",
                "nro caso",
                "nro. de caso",
                "caso",
                "case number",
                "case id",
            ],
            Self::OpenedAt => &[
                "fecha/hora de apertura",
                "fecha/hora apertura",
                "fecha hora de apertura",
                "fecha de apertura",
                "fecha apertura",
                "fecha",
                "opened at",
                "open date",
            ],
            Self::LocationCode => &[
                "código de sucursal",
                "cod sucursal",
                "sucursal",
                "código tienda",
                "tienda",
                "local",
                "location",
                "store",
            ],
            Self::StoreResponse => &[
                "respuesta tienda",
                "respuesta de tienda",
                "respuesta sucursal",
                "respuesta",
                "store response",
            ],
            Self::QualityFinding => &[
                "definición equipo calidad",
                "definición equipo de calidad",
                "definición calidad",
                "definición",
                "quality finding",
            ],
            Self::Status => &["estado", "estado del caso", "status"],
            Self::ProductId => &[
                "ean",
                "código ean",
                "cod ean",
                "ean13",
                "código de barras",
                "product id",
                "sku",
            ],
            Self::Category => &["categoría", "categoría producto", "category"],
            Self::SubType => &[
                "subtipo",
                "sub tipo",
                "sub-tipo",
                "subtipo de reclamo",
                "tipo de reclamo",
                "motivo",
                "subtype",
            ],
            Self::Lot => &[
                "lote nro.",
                "nro lote",
                "nro. de lote",
                "número de lote",
                "lote",
                "lot",
            ],
            Self::ExpirationDate => &[
                "fecha de vencimiento",
                "fecha vencimiento",
                "vencimiento",
                "expiration date",
            ],
            Self::Description => &[
                "descripción",
                "descripción producto",
                "descripción del producto",
                "producto",
                "description",
            ],
            Self::Supplier => &[
                "razón social",
                "proveedor",
                "razón social proveedor",
                "supplier",
            ],
        }
    }
}

impl fmt::Display for SemanticField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// One row of a declarative field table: a semantic field, its ordered
/// candidate spellings, and whether the dataset is useless without it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub field: SemanticField,
    pub candidates: &'static [&'static str],
    pub required: bool,
}

impl FieldSpec {
    /// Spec using the field's built-in candidate list.
    pub const fn new(field: SemanticField, candidates: &'static [&'static str]) -> Self {
        Self {
            field,
            candidates,
            required: false,
        }
    }

    /// Mark the field as required.
    pub const fn required(self) -> Self {
        Self {
            required: true,
            ..self
        }
    }
}

/// Field table for the complaint log.
pub fn complaint_field_specs() -> Vec<FieldSpec> {
    SemanticField::ALL
        .iter()
        .map(|field| {
            let spec = FieldSpec::new(*field, field.candidates());
            if *field == SemanticField::ProductId {
                spec.required()
            } else {
                spec
            }
        })
        .collect()
}

/// Field table for the product reference table.
pub fn reference_field_specs() -> Vec<FieldSpec> {
    vec![
        FieldSpec::new(
            SemanticField::ProductId,
            SemanticField::ProductId.candidates(),
        )
        .required(),
        FieldSpec::new(
            SemanticField::Description,
            SemanticField::Description.candidates(),
        ),
        FieldSpec::new(SemanticField::Supplier, SemanticField::Supplier.candidates()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::normalize_header;
    use std::collections::HashMap;

    #[test]
    fn test_candidates_never_collide_across_fields() {
        let mut owners: HashMap<String, SemanticField> = HashMap::new();
        for field in SemanticField::ALL {
            for candidate in field.candidates() {
                let normalized = normalize_header(candidate);
                if let Some(owner) = owners.insert(normalized.clone(), field) {
                    assert_eq!(
                        owner, field,
                        "'{}' is a candidate of both {} and {}",
                        normalized, owner, field
                    );
                }
            }
        }
    }

    #[test]
    fn test_canonical_name_resolves_to_its_own_field() {
        for field in SemanticField::ALL {
            let canonical = normalize_header(field.canonical_name());
            let matches = field
                .candidates()
                .iter()
                .any(|c| normalize_header(c) == canonical);
            assert!(matches, "{} does not accept its own canonical name", field);
        }
    }

    #[test]
    fn test_key_matches_serde() {
        for field in SemanticField::ALL {
            let json = serde_json::to_string(&field).unwrap();
            assert_eq!(json, format!("\"{}\"", field.key()));
        }
    }

    #[test]
    fn test_only_product_id_is_required() {
        let specs = complaint_field_specs();
        assert_eq!(specs.len(), SemanticField::ALL.len());
        let required: Vec<_> = specs.iter().filter(|s| s.required).map(|s| s.field).collect();
        assert_eq!(required, vec![SemanticField::ProductId]);

        let reference = reference_field_specs();
        assert_eq!(reference.len(), 3);
        assert!(reference[0].required);
    }
}
