use std::path::{Component, Path};

use serde::Deserialize;
use serde_json::Value;

use crate::foundation::error::{UgoiraError, UgoiraResult};

/// One still frame of the animation.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Frame {
    /// File name inside the extracted frames directory.
    #[serde(rename = "file")]
    pub name: String,
    /// Display duration in milliseconds.
    #[serde(rename = "delay")]
    pub delay_ms: u32,
}

/// Decoded ugoira meta: where the frames archive lives and the playback order.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct MetaInfo {
    /// URL of the original-resolution frames ZIP.
    #[serde(rename = "originalSrc")]
    pub zip_url: String,
    /// Frames in playback order; never empty after [`decode_meta`].
    pub frames: Vec<Frame>,
}

/// Decode Pixiv's ugoira meta JSON.
///
/// Accepts both the AJAX response (`{"error", "message", "body": {...}}`) and the bare
/// body as written by downloaders and bundled in `animation.json`.
pub fn decode_meta(meta: &Value) -> UgoiraResult<MetaInfo> {
    let body = meta.get("body").unwrap_or(meta);
    let mi = MetaInfo::deserialize(body).map_err(|e| {
        tracing::debug!(error = %e, "meta decode failed");
        invalid_meta()
    })?;

    if mi.frames.is_empty() {
        return Err(invalid_meta());
    }
    if let Some(bad) = mi.frames.iter().find(|f| !is_plain_file_name(&f.name)) {
        return Err(UgoiraError::meta_invalid(format!(
            "Invalid meta file (frame name '{}' is not a plain file name)",
            bad.name
        )));
    }

    Ok(mi)
}

/// Pixiv's own error text when the response is flagged with a truthy `error`.
pub fn pixiv_error(meta: &Value) -> Option<String> {
    let flagged = match meta.get("error")? {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Null => false,
    };
    if !flagged {
        return None;
    }

    let message = meta
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("unknown error");
    Some(message.to_string())
}

fn invalid_meta() -> UgoiraError {
    UgoiraError::meta_invalid("Invalid meta file (missing fields or wrong data types)")
}

fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use serde_json::json;

    fn body() -> Value {
        json!({
            "src": "https://i.pximg.net/img-zip-ugoira/img/x_ugoira600x600.zip",
            "originalSrc": "https://i.pximg.net/img-zip-ugoira/img/x_ugoira1920x1080.zip",
            "mime_type": "image/jpeg",
            "frames": [
                {"file": "000000.jpg", "delay": 40},
                {"file": "000001.jpg", "delay": 60},
            ]
        })
    }

    #[test]
    fn wrapped_and_bare_forms_agree() {
        let wrapped = json!({"error": false, "message": "", "body": body()});
        let a = decode_meta(&wrapped).unwrap();
        let b = decode_meta(&body()).unwrap();
        assert_eq!(a, b);
        assert_eq!(
            a.zip_url,
            "https://i.pximg.net/img-zip-ugoira/img/x_ugoira1920x1080.zip"
        );
        assert_eq!(
            a.frames,
            vec![
                Frame {
                    name: "000000.jpg".to_string(),
                    delay_ms: 40
                },
                Frame {
                    name: "000001.jpg".to_string(),
                    delay_ms: 60
                },
            ]
        );
    }

    #[test]
    fn decoding_is_idempotent() {
        let v = body();
        assert_eq!(decode_meta(&v).unwrap(), decode_meta(&v).unwrap());
    }

    #[test]
    fn shape_errors_are_meta_invalid() {
        let cases = [
            json!({"frames": [{"file": "a.jpg", "delay": 1}]}),
            json!({"originalSrc": "u"}),
            json!({"originalSrc": "u", "frames": []}),
            json!({"originalSrc": "u", "frames": [{"file": "a.jpg"}]}),
            json!({"originalSrc": "u", "frames": [{"file": 3, "delay": 1}]}),
            json!({"originalSrc": "u", "frames": [{"file": "a.jpg", "delay": "40"}]}),
            json!({"originalSrc": "u", "frames": [{"file": "a.jpg", "delay": -1}]}),
            json!({"originalSrc": 1, "frames": [{"file": "a.jpg", "delay": 1}]}),
            json!({"body": null}),
            json!([1, 2, 3]),
        ];
        for case in cases {
            let err = decode_meta(&case).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::MetaInvalid, "{case}");
        }
    }

    #[test]
    fn frame_names_must_stay_inside_frames_dir() {
        for name in ["../escape.jpg", "/etc/passwd", "sub/000000.jpg", ""] {
            let v = json!({"originalSrc": "u", "frames": [{"file": name, "delay": 40}]});
            assert_eq!(
                decode_meta(&v).unwrap_err().kind(),
                ErrorKind::MetaInvalid,
                "{name}"
            );
        }
    }

    #[test]
    fn pixiv_error_flag() {
        let v = json!({"error": true, "message": "Not found", "body": null});
        assert_eq!(pixiv_error(&v).as_deref(), Some("Not found"));

        let v = json!({"error": false, "message": "", "body": body()});
        assert_eq!(pixiv_error(&v), None);

        assert_eq!(pixiv_error(&body()), None);
        assert_eq!(
            pixiv_error(&json!({"error": 1})).as_deref(),
            Some("unknown error")
        );
    }
}
