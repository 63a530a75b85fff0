use std::fmt::Write as _;
use std::io::Read;

use base64::{
    Engine as _,
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};
use bzip2::read::BzDecoder;
use serde::Deserialize;

use crate::{
    error::{AppError, Result},
    models::brick::{BrickBundle, BrickVariables, BundledHook, Environment},
};

/// Bundled documents may be line-wrapped and unpadded.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// A file embedded in a bundle, base64 encoded.
#[derive(Deserialize, Default)]
struct BundledFile {
    #[serde(default)]
    data: String,
}

#[derive(Deserialize)]
struct RawBundle {
    name: String,
    #[serde(default)]
    environment: Environment,
    #[serde(default)]
    vars: BrickVariables,
    #[serde(default)]
    hooks: Vec<BundledHook>,
    #[serde(default)]
    readme: Option<BundledFile>,
    #[serde(default)]
    changelog: Option<BundledFile>,
    #[serde(default)]
    license: Option<BundledFile>,
}

/// Decodes a `.bundle` archive: bzip2 compressed JSON whose documents are
/// base64 encoded.
pub fn decode(archive: &[u8]) -> Result<BrickBundle> {
    let mut json = Vec::new();
    BzDecoder::new(archive)
        .read_to_end(&mut json)
        .map_err(|e| AppError::Bundle(format!("Decompression failed: {}", e)))?;

    let raw: RawBundle = sonic_rs::from_slice(&json)
        .map_err(|e| AppError::Bundle(format!("Invalid bundle JSON: {}", e)))?;

    Ok(BrickBundle {
        readme: decode_file(raw.readme, "readme")?,
        changelog: decode_file(raw.changelog, "changelog")?,
        license: decode_file(raw.license, "license")?,
        name: raw.name,
        environment: raw.environment,
        vars: raw.vars,
        hooks: raw.hooks,
    })
}

fn decode_file(file: Option<BundledFile>, what: &str) -> Result<String> {
    let data = file.unwrap_or_default().data;
    let data: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = LENIENT
        .decode(data)
        .map_err(|e| AppError::Bundle(format!("Invalid {} encoding: {}", what, e)))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Writes the usage document shown on the brick page.
pub fn usage(bundle: &BrickBundle) -> String {
    let name = &bundle.name;
    let mut doc = String::new();

    doc.push_str(
        "\n## Setup 🧑‍💻\n\n\
         Ensure you have the [mason_cli](https://github.com/felangel/mason/tree/master/packages/mason_cli) installed.\n\n\
         ```sh\n# 🎯 Activate from https://pub.dev\ndart pub global activate mason_cli\n```\n\n\
         ```sh\n# 🍺 Or install from https://brew.sh\nbrew tap felangel/mason\nbrew install mason\n```\n\n",
    );

    let _ = write!(
        doc,
        "## Installation ☁️\n\n\
         ```sh\n# Install locally\nmason add {name}\n```\n\n\
         ```sh\n# Install globally\nmason add -g {name}\n```\n\n\
         ## Usage 🚀\n\n\
         ```sh\nmason make {name}\n```\n\n"
    );

    doc.push_str(
        "## Variables ✨\n\n\
         | Name | Description | Default | Type |\n\
         | ---- | ------------| --------| -----|\n",
    );
    for (var_name, var) in bundle.vars.iter() {
        let _ = writeln!(
            doc,
            "{} | {} | {} | {}",
            var_name,
            var.description.as_deref().unwrap_or("(empty)"),
            var.default.as_deref().unwrap_or("(empty)"),
            var.kind
        );
    }

    let mark = |present: bool| if present { "✅" } else { "❌" };
    let _ = write!(
        doc,
        "\n## Hooks 🪝\n\n\
         - {} &nbsp; Pre-Gen\n\
         - {} &nbsp; Post-Gen\n\n",
        mark(bundle.has_hook("pre_gen.dart")),
        mark(bundle.has_hook("post_gen.dart")),
    );

    let _ = write!(
        doc,
        "## Environment 🌎\n\n```yaml\nmason: \"{}\"\n```\n",
        bundle.environment.mason
    );

    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose;
    use bzip2::write::BzEncoder;
    use bzip2::Compression;
    use std::io::Write;

    fn b64(s: &str) -> String {
        general_purpose::STANDARD.encode(s)
    }

    fn compress(json: &str) -> Vec<u8> {
        let mut encoder = BzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(json.as_bytes()).unwrap();
        encoder.finish().unwrap()
    }

    fn sample_json() -> String {
        format!(
            r#"{{
                "name": "greeting",
                "description": "A greeting brick",
                "version": "0.1.0",
                "environment": {{"mason": ">=0.1.0 <0.2.0"}},
                "vars": {{
                    "name": {{"type": "string", "description": "Your name", "default": "Dash", "prompt": "What is your name?"}},
                    "loud": {{"type": "boolean"}}
                }},
                "hooks": [{{"path": "pre_gen.dart", "data": "{}"}}],
                "readme": {{"path": "README.md", "data": "{}", "type": "text"}},
                "changelog": {{"path": "CHANGELOG.md", "data": "{}", "type": "text"}},
                "license": {{"path": "LICENSE", "data": "{}", "type": "text"}},
                "files": []
            }}"#,
            b64("void run(HookContext context) {}"),
            b64("# Greeting 👋"),
            b64("# 0.1.0\n\n- initial release"),
            b64("MIT License"),
        )
    }

    #[test]
    fn bundle_is_decompressed_and_decoded() {
        let bundle = decode(&compress(&sample_json())).unwrap();

        assert_eq!(bundle.name, "greeting");
        assert_eq!(bundle.environment.mason, ">=0.1.0 <0.2.0");
        assert_eq!(bundle.readme, "# Greeting 👋");
        assert_eq!(bundle.changelog, "# 0.1.0\n\n- initial release");
        assert_eq!(bundle.license, "MIT License");
        assert_eq!(bundle.vars.len(), 2);
        assert!(bundle.has_hook("pre_gen.dart"));
        assert!(!bundle.has_hook("post_gen.dart"));
    }

    #[test]
    fn missing_documents_decode_to_empty_text() {
        let bundle = decode(&compress(r#"{"name":"bare"}"#)).unwrap();
        assert_eq!(bundle.readme, "");
        assert_eq!(bundle.license, "");
        assert!(bundle.vars.is_empty());
    }

    #[test]
    fn wrapped_and_unpadded_documents_decode() {
        let bundle = decode(&compress(
            r#"{"name":"wrapped","readme":{"data":"IyBIZWxsbyB3b3Js\nZA=="},"license":{"data":"TUlU\r\n"},"changelog":{"data":"IyAwLjEuMA"}}"#,
        ))
        .unwrap();
        assert_eq!(bundle.readme, "# Hello world");
        assert_eq!(bundle.license, "MIT");
        assert_eq!(bundle.changelog, "# 0.1.0");
    }

    #[test]
    fn garbage_archive_is_a_bundle_error() {
        assert!(matches!(decode(b"definitely not bzip2"), Err(AppError::Bundle(_))));
        assert!(matches!(decode(&compress("not json")), Err(AppError::Bundle(_))));
        assert!(matches!(
            decode(&compress(r#"{"name":"x","readme":{"data":"%%%"}}"#)),
            Err(AppError::Bundle(_))
        ));
    }

    #[test]
    fn usage_describes_install_variables_hooks_and_environment() {
        let bundle = decode(&compress(&sample_json())).unwrap();
        let doc = usage(&bundle);

        assert!(doc.contains("mason add greeting\n"));
        assert!(doc.contains("mason add -g greeting\n"));
        assert!(doc.contains("mason make greeting\n"));
        assert!(doc.contains("name | Your name | Dash | string\n"));
        assert!(doc.contains("loud | (empty) | (empty) | boolean\n"));
        assert!(doc.contains("- ✅ &nbsp; Pre-Gen"));
        assert!(doc.contains("- ❌ &nbsp; Post-Gen"));
        assert!(doc.contains("mason: \">=0.1.0 <0.2.0\""));

        let name_row = doc.find("name | Your name").unwrap();
        let loud_row = doc.find("loud | (empty)").unwrap();
        assert!(name_row < loud_row);
    }
}
