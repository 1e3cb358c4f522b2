//! HTML rendering of invoices and service agreements.
//!
//! Both templates are registered once, on first use. The output is plain
//! structural markup; all interpolated values are HTML-escaped by handlebars.

use handlebars::Handlebars;
use lazy_static::lazy_static;
use serde::Serialize;

use crate::error::{LedgerError, Result};

const INVOICE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>{{doc_label}} {{invoice_number}}</title></head>
<body>
<header>
  <h1>{{doc_label}}</h1>
  <p class="invoice-number">Invoice No: {{invoice_number}}</p>
  <p class="uid">UID: {{uid}}</p>
  <p class="date">Date: {{date}}</p>
</header>
<section class="client">
  <p>{{customer_name}}</p>
  {{#if mobile}}<p>{{mobile}}</p>{{/if}}
  {{#if address}}<p>{{address}}</p>{{/if}}
</section>
<section class="service">
  <h2>{{plan}}</h2>
  <p class="shift">{{service_line}}</p>
  <p class="duration">{{duration_line}}</p>
  <p class="rate">{{rate_line}}</p>
  <ul class="included">
  {{#each included}}    <li>{{this}}</li>
  {{/each}}</ul>
  {{#if not_included}}<h3>Not Included</h3>
  <ul class="not-included">
  {{#each not_included}}    <li>{{this}}</li>
  {{/each}}</ul>{{/if}}
</section>
<section class="amount">
  <p class="paid-for">{{paid_for}}</p>
  <p class="total">Total: &#8377; {{total}}</p>
  <p class="note">{{note}}</p>
</section>
{{#if referral_name}}<footer class="referral">Referred by {{referral_name}}</footer>{{/if}}
</body>
</html>
"#;

const AGREEMENT_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>{{doc_label}} {{invoice_number}}</title></head>
<body>
<header>
  <h1>{{doc_label}}</h1>
  <p class="invoice-number">Invoice No: {{invoice_number}}</p>
  <p class="date">Date: {{date}}</p>
</header>
<section class="parties">
  <p class="staff">{{role}}: {{staff_name}}{{#if staff_age}}, aged {{staff_age}}{{/if}}{{#if staff_address}}, residing at {{staff_address}}{{/if}}{{#if staff_id_number}} (ID {{staff_id_number}}){{/if}}</p>
  <p class="client">Client: {{customer_name}}{{#if location}}, {{location}}{{/if}}</p>
</section>
<section class="scope">
  <h2>{{plan}}</h2>
  <ul>
  {{#each duties}}    <li>{{this}}</li>
  {{/each}}</ul>
</section>
{{#if doc_hash}}<footer class="verification">Document ref: {{doc_hash}}</footer>{{/if}}
</body>
</html>
"#;

lazy_static! {
    static ref REGISTRY: std::result::Result<Handlebars<'static>, String> = build_registry();
}

fn build_registry() -> std::result::Result<Handlebars<'static>, String> {
    let mut hb = Handlebars::new();
    hb.set_strict_mode(true);
    hb.register_template_string("invoice", INVOICE_TEMPLATE)
        .map_err(|e| e.to_string())?;
    hb.register_template_string("agreement", AGREEMENT_TEMPLATE)
        .map_err(|e| e.to_string())?;
    Ok(hb)
}

fn render<T: Serialize>(name: &str, view: &T) -> Result<String> {
    let hb = REGISTRY
        .as_ref()
        .map_err(|e| LedgerError::Template(e.clone()))?;
    Ok(hb.render(name, view)?)
}

/// Everything printed on an invoice, already formatted.
#[derive(Debug, Clone, Default, Serialize)]
pub struct InvoiceView {
    pub doc_label: String,
    pub invoice_number: String,
    pub uid: String,
    pub date: String,
    pub customer_name: String,
    pub mobile: String,
    pub address: String,
    pub plan: String,
    pub service_line: String,
    pub duration_line: String,
    pub rate_line: String,
    pub included: Vec<String>,
    pub not_included: Vec<String>,
    pub paid_for: String,
    pub total: String,
    pub note: String,
    pub referral_name: String,
}

/// Everything printed on a service agreement.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AgreementView {
    pub doc_label: String,
    pub invoice_number: String,
    pub date: String,
    pub role: String,
    pub staff_name: String,
    pub staff_age: String,
    pub staff_address: String,
    pub staff_id_number: String,
    pub customer_name: String,
    pub location: String,
    pub plan: String,
    pub duties: Vec<String>,
    pub doc_hash: String,
}

pub fn render_invoice(view: &InvoiceView) -> Result<String> {
    render("invoice", view)
}

pub fn render_agreement(view: &AgreementView) -> Result<String> {
    render("agreement", view)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invoice() -> InvoiceView {
        InvoiceView {
            doc_label: "Invoice".to_string(),
            invoice_number: "PUN-240101-001".to_string(),
            uid: "0001".to_string(),
            date: "Jan. 1st 2024".to_string(),
            customer_name: "Asha Rao".to_string(),
            plan: "Nursing Care".to_string(),
            service_line: "24 Hours".to_string(),
            duration_line: "For 30 Days".to_string(),
            rate_line: "24 Hours / Day = ₹ 1,800".to_string(),
            included: vec!["Medication Management".to_string()],
            paid_for: "Paid for 1 Week".to_string(),
            total: "12,600".to_string(),
            note: "Paid for 7 Days.".to_string(),
            ..InvoiceView::default()
        }
    }

    #[test]
    fn invoice_carries_numbers_and_lines() {
        let html = render_invoice(&invoice()).unwrap();
        assert!(html.contains("Invoice No: PUN-240101-001"));
        assert!(html.contains("UID: 0001"));
        assert!(html.contains("<p class=\"duration\">For 30 Days</p>"));
        assert!(html.contains("<li>Medication Management</li>"));
        assert!(html.contains("&#8377; 12,600"));
        assert!(!html.contains("Not Included"));
        assert!(!html.contains("Referred by"));
    }

    #[test]
    fn values_are_escaped() {
        let mut view = invoice();
        view.customer_name = "<b>Rao & Sons</b>".to_string();
        let html = render_invoice(&view).unwrap();
        assert!(html.contains("&lt;b&gt;Rao &amp; Sons&lt;/b&gt;"));
        assert!(!html.contains("<b>Rao"));
    }

    #[test]
    fn agreement_lists_duties_and_hash() {
        let view = AgreementView {
            doc_label: "Caregiver Service Agreement".to_string(),
            invoice_number: "MUM-240102-004".to_string(),
            role: "Nurse".to_string(),
            staff_name: "Meera".to_string(),
            staff_age: "29".to_string(),
            customer_name: "Asha Rao".to_string(),
            duties: vec!["Post-Surgical Care".to_string(), "Medication Management".to_string()],
            doc_hash: "0123456789abcdef".to_string(),
            ..AgreementView::default()
        };
        let html = render_agreement(&view).unwrap();
        assert!(html.contains("Nurse: Meera, aged 29"));
        assert!(!html.contains("residing at"));
        assert!(html.contains("<li>Post-Surgical Care</li>"));
        assert!(html.contains("Document ref: 0123456789abcdef"));
    }
}
