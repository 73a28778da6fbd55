use tera::Tera;

pub const FORM_TEMPLATE: &str = "profile_form.html";
pub const DETAIL_TEMPLATE: &str = "profile_detail.html";
pub const PDF_TEMPLATE: &str = "profile_pdf.html";
pub const DEBUG_TEMPLATE: &str = "debug_pdf.html";

/// Compiles the templates embedded in the binary. `.html` names are autoescaped.
pub fn load_templates() -> Result<Tera, tera::Error> {
    let mut tera = Tera::default();
    tera.add_raw_templates(vec![
        ("base.html", include_str!("../../templates/base.html")),
        (FORM_TEMPLATE, include_str!("../../templates/profile_form.html")),
        (DETAIL_TEMPLATE, include_str!("../../templates/profile_detail.html")),
        (PDF_TEMPLATE, include_str!("../../templates/profile_pdf.html")),
        (DEBUG_TEMPLATE, include_str!("../../templates/debug_pdf.html")),
    ])?;
    Ok(tera)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tera::Context;

    #[test]
    fn embedded_templates_compile() {
        let tera = load_templates().unwrap();
        let names: Vec<_> = tera.get_template_names().collect();
        for name in [FORM_TEMPLATE, DETAIL_TEMPLATE, PDF_TEMPLATE, DEBUG_TEMPLATE] {
            assert!(names.contains(&name), "{name} missing");
        }
    }

    #[test]
    fn pdf_template_escapes_profile_fields() {
        let tera = load_templates().unwrap();
        let mut context = Context::new();
        context.insert(
            "profile",
            &serde_json::json!({
                "name": "<script>alert(1)</script>",
                "email": "a@b.c",
                "phone": "1",
                "summary": "s",
                "previous_work": "w",
                "skills": "k"
            }),
        );
        context.insert("educations", &Vec::<serde_json::Value>::new());

        let html = tera.render(PDF_TEMPLATE, &context).unwrap();
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>alert"));
    }
}
