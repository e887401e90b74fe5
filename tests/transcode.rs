//! Public-API tests for the transcoding engine's core guarantees.

use math2any::{transcode, Expression, FORMATS};

#[test]
fn transcode_is_total_for_arbitrary_inputs() {
    let inputs = [
        "",
        " ",
        r"\frac{a}{b}",
        r"\frac{a}{",
        "not math at all",
        "x = 1 \\\\ y = 2",
        "{{{{",
        r"\unknowncmd{3}",
        "∑ₙ aₙ",
        "\\",
    ];
    for input in inputs {
        let bundle = transcode(&Expression::new(input));
        for format in FORMATS {
            assert!(
                bundle.get(format.id).is_some(),
                "format {} missing for input {input:?}",
                format.id
            );
        }
    }
}

#[test]
fn latex_key_is_identity() {
    for input in ["", r"\alpha^{2}", "anything"] {
        let bundle = transcode(&Expression::new(input));
        assert_eq!(bundle.get("latex"), Some(input));
        assert_eq!(bundle.latex(), input);
    }
}

#[test]
fn mathml_is_always_one_balanced_element() {
    for input in [r"\frac{a}{b}", r"\garbage{", "", "x^2"] {
        let bundle = transcode(&Expression::new(input));
        for key in ["mathml", "mathml_presentation", "mathml_content"] {
            let xml = bundle.get(key).unwrap();
            let flat: String = xml.split_whitespace().collect::<Vec<_>>().join(" ");
            assert!(flat.starts_with("<math"), "{key} for {input:?}: {xml}");
            assert!(flat.ends_with("</math>"), "{key} for {input:?}: {xml}");
            assert_eq!(
                xml.matches("<math").count(),
                xml.matches("</math>").count(),
                "{key} unbalanced for {input:?}"
            );
        }
    }
}

#[test]
fn unparseable_input_gets_mtext_wrapper() {
    let bundle = transcode(&Expression::new(r"\garbage{"));
    assert!(bundle.get("mathml").unwrap().contains("<mtext>"));
}

#[test]
fn asciimath_fraction_fixture() {
    let bundle = transcode(&Expression::new(r"\frac{a}{b}"));
    assert!(bundle.get("asciimath").unwrap().contains("(a)/(b)"));
}

#[test]
fn bundles_always_carry_the_full_catalog() {
    let bundle = transcode(&Expression::new(r"e^{i\pi} + 1 = 0"));
    assert_eq!(bundle.len(), 12);
    assert!(bundle.is_complete());
}
