//! Field extraction from document text.
//!
//! Ordered pattern rules per field, first match wins; each extracted
//! field carries a confidence tag. The optional assist path fills gaps
//! with lower-trust values and never overrules a pattern match.

use std::collections::BTreeMap;
use tracing::debug;

use crate::extract::patterns::{
    detect_occupation, detect_property_type, parse_french_date, parse_visit_slot, PatternRules,
};
use crate::reconcile::normalize_text;
use crate::types::listing::{AuctionFields, Confidence, Field};

/// A partial field set with per-field confidence tags.
#[derive(Debug, Clone, Default)]
pub struct ExtractedFieldSet {
    pub fields: AuctionFields,
    pub confidence: BTreeMap<Field, Confidence>,
}

impl ExtractedFieldSet {
    /// Fields whose values came only from the assist path.
    pub fn assist_fields(&self) -> AuctionFields {
        let mut out = AuctionFields::default();
        for (&field, &confidence) in &self.confidence {
            if confidence != Confidence::Assist {
                continue;
            }
            match field {
                Field::Address => out.address = self.fields.address.clone(),
                Field::PostalCode => out.postal_code = self.fields.postal_code.clone(),
                Field::City => out.city = self.fields.city.clone(),
                Field::PropertyType => out.property_type = self.fields.property_type,
                Field::Surface => out.surface = self.fields.surface,
                Field::Rooms => out.rooms = self.fields.rooms,
                Field::Floor => out.floor = self.fields.floor,
                Field::StartingPrice => out.starting_price = self.fields.starting_price,
                Field::SaleDate => out.sale_date = self.fields.sale_date,
                Field::SaleTime => out.sale_time = self.fields.sale_time.clone(),
                Field::Tribunal => out.tribunal = self.fields.tribunal.clone(),
                Field::LawyerName => out.lawyer_name = self.fields.lawyer_name.clone(),
                Field::LawyerContact => out.lawyer_contact = self.fields.lawyer_contact.clone(),
                Field::DocumentUrl => out.document_url = self.fields.document_url.clone(),
                Field::Occupation => out.occupation = self.fields.occupation.clone(),
                Field::Description => out.description = self.fields.description.clone(),
                Field::CaseNumber => out.case_number = self.fields.case_number.clone(),
            }
        }
        out
    }

    /// Fields backed by a pattern match (everything not assist-only).
    pub fn pattern_fields(&self) -> AuctionFields {
        let mut out = self.fields.clone();
        let assist = self.assist_fields();
        // Null out the assist-only values
        if assist.address.is_some() {
            out.address = None;
        }
        if assist.postal_code.is_some() {
            out.postal_code = None;
        }
        if assist.city.is_some() {
            out.city = None;
        }
        if assist.property_type.is_some() {
            out.property_type = None;
        }
        if assist.surface.is_some() {
            out.surface = None;
        }
        if assist.rooms.is_some() {
            out.rooms = None;
        }
        if assist.floor.is_some() {
            out.floor = None;
        }
        if assist.starting_price.is_some() {
            out.starting_price = None;
        }
        if assist.sale_date.is_some() {
            out.sale_date = None;
        }
        if assist.sale_time.is_some() {
            out.sale_time = None;
        }
        if assist.tribunal.is_some() {
            out.tribunal = None;
        }
        if assist.lawyer_name.is_some() {
            out.lawyer_name = None;
        }
        if assist.lawyer_contact.is_some() {
            out.lawyer_contact = None;
        }
        if assist.document_url.is_some() {
            out.document_url = None;
        }
        if assist.occupation.is_some() {
            out.occupation = None;
        }
        if assist.description.is_some() {
            out.description = None;
        }
        if assist.case_number.is_some() {
            out.case_number = None;
        }
        out
    }
}

/// Parses extracted text into structured auction fields.
pub struct FieldExtractor {
    rules: PatternRules,
}

impl Default for FieldExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor {
    pub fn new() -> Self {
        Self {
            rules: PatternRules::new(),
        }
    }

    /// Run the pattern rules over a text. Absent fields stay `None`;
    /// nothing here can fail the extraction as a whole.
    pub fn extract(&self, text: &str) -> ExtractedFieldSet {
        let mut set = ExtractedFieldSet::default();
        let fields = &mut set.fields;

        if let Some(address) = self.rules.match_address(text) {
            fields.address = Some(address);
            set.confidence.insert(Field::Address, Confidence::Pattern);
        }
        if let Some(caps) = self.rules.postal_code.captures(text) {
            fields.postal_code = Some(caps[1].to_string());
            set.confidence
                .insert(Field::PostalCode, Confidence::Pattern);
        }
        if let Some(caps) = self.rules.city_after_postal.captures(text) {
            fields.city = Some(caps[1].trim().to_string());
            set.confidence.insert(Field::City, Confidence::Pattern);
        }
        if let Some(property_type) = detect_property_type(text) {
            fields.property_type = Some(property_type);
            set.confidence
                .insert(Field::PropertyType, Confidence::Pattern);
        }
        if let Some(surface) = self.rules.match_surface(text) {
            fields.surface = Some(surface);
            set.confidence.insert(Field::Surface, Confidence::Pattern);
        }
        if let Some(caps) = self.rules.rooms.captures(text) {
            fields.rooms = caps[1].parse().ok();
            if fields.rooms.is_some() {
                set.confidence.insert(Field::Rooms, Confidence::Pattern);
            }
        }
        if let Some(caps) = self.rules.floor.captures(text) {
            fields.floor = caps[1].parse().ok();
            if fields.floor.is_some() {
                set.confidence.insert(Field::Floor, Confidence::Pattern);
            }
        }
        if let Some(price) = self.rules.match_starting_price(text) {
            fields.starting_price = Some(price);
            set.confidence
                .insert(Field::StartingPrice, Confidence::Pattern);
        }
        if let Some(caps) = self.rules.sale_date.captures(text) {
            if let Some(date) = parse_french_date(&caps[1]) {
                fields.sale_date = Some(date);
                set.confidence.insert(Field::SaleDate, Confidence::Pattern);
            }
        }
        if let Some(caps) = self.rules.sale_time.captures(text) {
            let hour = &caps[1];
            let minutes = caps.get(2).map(|m| m.as_str()).unwrap_or("00");
            fields.sale_time = Some(format!("{hour}h{minutes}"));
            set.confidence.insert(Field::SaleTime, Confidence::Pattern);
        }
        if let Some(occupation) = detect_occupation(text) {
            fields.occupation = Some(occupation);
            set.confidence
                .insert(Field::Occupation, Confidence::Pattern);
        }
        if let Some(caps) = self.rules.tribunal.captures(text) {
            fields.tribunal = Some(format!("Tribunal Judiciaire de {}", title_case(&caps[1])));
            set.confidence.insert(Field::Tribunal, Confidence::Pattern);
        }
        if let Some(caps) = self.rules.lawyer.captures(text) {
            fields.lawyer_name = Some(format!("Me {}", &caps[1]));
            set.confidence
                .insert(Field::LawyerName, Confidence::Pattern);
        }
        if let Some(caps) = self.rules.case_number.captures(text) {
            fields.case_number = Some(caps[1].to_string());
            set.confidence
                .insert(Field::CaseNumber, Confidence::Pattern);
        }

        // Visit slots: every date inside the "visites:" section
        if let Some(section) = self.rules.visit_section.captures(text) {
            let section_text = &section[1];
            for caps in self.rules.any_date.captures_iter(section_text) {
                if let Some(slot) = parse_visit_slot(&caps[1], None) {
                    fields.visit_dates.push(slot);
                }
            }
            fields.visit_dates.sort();
            fields.visit_dates.dedup();
        }

        debug!(
            extracted = set.confidence.len(),
            "pattern extraction finished"
        );
        set
    }

    /// Overlay assist output on a pattern result. Assist values only fill
    /// gaps; where both paths produced a value, agreement upgrades the
    /// pattern tag to `Confirmed` and disagreement keeps the pattern value.
    pub fn merge_assist(&self, mut base: ExtractedFieldSet, assist: AuctionFields) -> ExtractedFieldSet {
        merge_assist_text(
            &mut base.fields.address,
            assist.address,
            Field::Address,
            &mut base.confidence,
        );
        merge_assist_text(
            &mut base.fields.postal_code,
            assist.postal_code,
            Field::PostalCode,
            &mut base.confidence,
        );
        merge_assist_text(
            &mut base.fields.city,
            assist.city,
            Field::City,
            &mut base.confidence,
        );
        merge_assist_eq(
            &mut base.fields.property_type,
            assist.property_type,
            Field::PropertyType,
            &mut base.confidence,
        );
        merge_assist_eq(
            &mut base.fields.surface,
            assist.surface,
            Field::Surface,
            &mut base.confidence,
        );
        merge_assist_eq(
            &mut base.fields.rooms,
            assist.rooms,
            Field::Rooms,
            &mut base.confidence,
        );
        merge_assist_eq(
            &mut base.fields.floor,
            assist.floor,
            Field::Floor,
            &mut base.confidence,
        );
        merge_assist_eq(
            &mut base.fields.starting_price,
            assist.starting_price,
            Field::StartingPrice,
            &mut base.confidence,
        );
        merge_assist_eq(
            &mut base.fields.sale_date,
            assist.sale_date,
            Field::SaleDate,
            &mut base.confidence,
        );
        merge_assist_text(
            &mut base.fields.sale_time,
            assist.sale_time,
            Field::SaleTime,
            &mut base.confidence,
        );
        merge_assist_text(
            &mut base.fields.tribunal,
            assist.tribunal,
            Field::Tribunal,
            &mut base.confidence,
        );
        merge_assist_text(
            &mut base.fields.lawyer_name,
            assist.lawyer_name,
            Field::LawyerName,
            &mut base.confidence,
        );
        merge_assist_text(
            &mut base.fields.lawyer_contact,
            assist.lawyer_contact,
            Field::LawyerContact,
            &mut base.confidence,
        );
        merge_assist_text(
            &mut base.fields.occupation,
            assist.occupation,
            Field::Occupation,
            &mut base.confidence,
        );
        merge_assist_text(
            &mut base.fields.description,
            assist.description,
            Field::Description,
            &mut base.confidence,
        );
        merge_assist_text(
            &mut base.fields.case_number,
            assist.case_number,
            Field::CaseNumber,
            &mut base.confidence,
        );
        base
    }
}

fn merge_assist_text(
    current: &mut Option<String>,
    incoming: Option<String>,
    field: Field,
    confidence: &mut BTreeMap<Field, Confidence>,
) {
    let Some(incoming) = incoming else { return };
    match current {
        Some(existing) => {
            if normalize_text(existing) == normalize_text(&incoming)
                && confidence.get(&field) == Some(&Confidence::Pattern)
            {
                confidence.insert(field, Confidence::Confirmed);
            }
        }
        None => {
            *current = Some(incoming);
            confidence.insert(field, Confidence::Assist);
        }
    }
}

fn merge_assist_eq<T: PartialEq>(
    current: &mut Option<T>,
    incoming: Option<T>,
    field: Field,
    confidence: &mut BTreeMap<Field, Confidence>,
) {
    let Some(incoming) = incoming else { return };
    match current {
        Some(existing) => {
            if *existing == incoming && confidence.get(&field) == Some(&Confidence::Pattern) {
                confidence.insert(field, Confidence::Confirmed);
            }
        }
        None => {
            *current = Some(incoming);
            confidence.insert(field, Confidence::Assist);
        }
    }
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => {
            first.to_uppercase().collect::<String>() + chars.as_str().to_lowercase().as_str()
        }
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const PV_TEXT: &str = "\
TRIBUNAL JUDICIAIRE DE PARIS\n\
Vente aux enchères publiques - adjudication le 12/03/2026 à 14h00\n\
RG n° 24/00817\n\
Un appartement de 3 pièces situé au 12 rue Oberkampf, 75011 Paris,\n\
au 4ème étage, d'une surface de 45,5 m², libre de toute occupation.\n\
Mise à prix : 185 000 €\n\
Visites : le 27/02/2026 et le 05/03/2026\n\
Maître Dupont, avocat au barreau de Paris\n";

    #[test]
    fn extracts_core_fields_from_pv() {
        let extractor = FieldExtractor::new();
        let set = extractor.extract(PV_TEXT);
        let fields = &set.fields;

        assert_eq!(fields.address.as_deref(), Some("12 rue Oberkampf"));
        assert_eq!(fields.postal_code.as_deref(), Some("75011"));
        assert_eq!(fields.surface, Some(45.5));
        assert_eq!(fields.rooms, Some(3));
        assert_eq!(fields.floor, Some(4));
        assert_eq!(fields.starting_price, Some(185_000.0));
        assert_eq!(
            fields.sale_date,
            NaiveDate::from_ymd_opt(2026, 3, 12)
        );
        assert_eq!(fields.occupation.as_deref(), Some("libre"));
        assert_eq!(fields.lawyer_name.as_deref(), Some("Me Dupont"));
        assert_eq!(fields.case_number.as_deref(), Some("24/00817"));
        assert_eq!(fields.visit_dates.len(), 2);
        assert_eq!(set.confidence.get(&Field::Surface), Some(&Confidence::Pattern));
    }

    #[test]
    fn unrecoverable_fields_stay_none() {
        let extractor = FieldExtractor::new();
        let set = extractor.extract("rien d'utile ici");
        assert!(set.fields.surface.is_none());
        assert!(set.fields.starting_price.is_none());
        assert!(set.confidence.is_empty());
    }

    #[test]
    fn assist_fills_gaps_but_never_overrules() {
        let extractor = FieldExtractor::new();
        let base = extractor.extract("Mise à prix : 100 000 €");

        let assist = AuctionFields {
            starting_price: Some(999_999.0),
            surface: Some(62.0),
            ..Default::default()
        };
        let merged = extractor.merge_assist(base, assist);

        // Pattern value survives the disagreement
        assert_eq!(merged.fields.starting_price, Some(100_000.0));
        assert_eq!(
            merged.confidence.get(&Field::StartingPrice),
            Some(&Confidence::Pattern)
        );
        // Gap filled, tagged lower-trust
        assert_eq!(merged.fields.surface, Some(62.0));
        assert_eq!(
            merged.confidence.get(&Field::Surface),
            Some(&Confidence::Assist)
        );
    }

    #[test]
    fn assist_agreement_upgrades_confidence() {
        let extractor = FieldExtractor::new();
        let base = extractor.extract("Mise à prix : 100 000 €");
        let assist = AuctionFields {
            starting_price: Some(100_000.0),
            ..Default::default()
        };
        let merged = extractor.merge_assist(base, assist);
        assert_eq!(
            merged.confidence.get(&Field::StartingPrice),
            Some(&Confidence::Confirmed)
        );
    }

    #[test]
    fn assist_only_fields_split_out() {
        let extractor = FieldExtractor::new();
        let base = extractor.extract("Mise à prix : 100 000 €");
        let assist = AuctionFields {
            surface: Some(62.0),
            ..Default::default()
        };
        let merged = extractor.merge_assist(base, assist);

        let assist_only = merged.assist_fields();
        assert_eq!(assist_only.surface, Some(62.0));
        assert!(assist_only.starting_price.is_none());

        let pattern_only = merged.pattern_fields();
        assert_eq!(pattern_only.starting_price, Some(100_000.0));
        assert!(pattern_only.surface.is_none());
    }
}
