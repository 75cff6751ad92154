//! キーフレーム検証
//!
//! - 生成テキストからキーフレーム（key slice）番号を解析
//! - 独立した再推論テキストとの一致度を主要医学用語のJaccard係数で評価

use crate::error::{Error, Result};
use regex::Regex;
use std::collections::BTreeSet;

/// 一致度の既定閾値
pub const DEFAULT_CONSISTENCY_THRESHOLD: f64 = 0.5;

/// 一致度計算に使う病変種別の語彙
pub const LESION_TYPE_TERMS: &[&str] = &[
    "hypoattenuating",
    "hyperattenuating",
    "isoattenuating",
    "mass",
    "lesion",
    "tumor",
];

lazy_static::lazy_static! {
    static ref TAGGED_SLICE_RE: Regex =
        Regex::new(r"(?i)<key_slice>\s*image\s*([0-9]+)\s*</key_slice>").unwrap();
    static ref BARE_SLICE_RE: Regex = Regex::new(r"(?i)image\s*([0-9]+)").unwrap();
    static ref LOCATION_TERM_RE: Regex =
        Regex::new(r"(?i)(hepatic segment|segment|liver|pancreas|kidney)\s*[0-9]+").unwrap();
    static ref SIZE_TERM_RE: Regex =
        Regex::new(r"(?i)([0-9]+\.?[0-9]*)\s*x\s*([0-9]+\.?[0-9]*)\s*cm").unwrap();
    static ref HU_TERM_RE: Regex = Regex::new(r"(?i)HU\s*value\s*of\s*([0-9]+\.?[0-9]*)").unwrap();
    static ref LESION_TERM_RES: Vec<(&'static str, Regex)> = LESION_TYPE_TERMS
        .iter()
        .map(|term| (*term, Regex::new(&format!("(?i){}", term)).unwrap()))
        .collect();
}

/// キーフレーム検証の結果
///
/// 番号と一致度は独立しており、番号が解析できなくても一致度は失われない。
#[derive(Debug, Clone, PartialEq)]
pub struct KeyFrameVerification {
    /// キーフレーム番号（1始まり）
    pub index: Option<u32>,
    /// 再推論テキストとの一致度 [0.0, 1.0]
    pub score: f64,
    /// 番号の解析に失敗した場合のエラー内容
    pub index_error: Option<String>,
}

/// キーフレーム番号を解析
///
/// 優先順位:
/// 1. `<key_slice>image N</key_slice>` タグ
/// 2. タグなしの "image N"（最後の出現を採用）
///
/// 番号はASCII数字のみ。全角数字などは言及なしとして扱う。
///
/// # Returns
/// * `Ok(None)` - 言及なし
/// * `Err` - 採用した番号がフレーム番号として扱えない場合
pub fn parse_key_slice_index(report_text: &str) -> Result<Option<u32>> {
    if report_text.is_empty() {
        return Ok(None);
    }

    let selected = match TAGGED_SLICE_RE.captures(report_text) {
        Some(cap) => cap.get(1),
        None => BARE_SLICE_RE
            .captures_iter(report_text)
            .last()
            .and_then(|cap| cap.get(1)),
    };

    match selected {
        Some(m) => m
            .as_str()
            .parse::<u32>()
            .map(Some)
            .map_err(|e| Error::Parse(format!("キーフレーム番号が不正です ({}): {}", m.as_str(), e))),
        None => Ok(None),
    }
}

/// 報告から主要医学用語の集合を抽出
///
/// - 解剖学的位置 + 番号（例: "hepatic segment 7"）
/// - 大きさ（"W x H cm" に正規化）
/// - HU値（"hu_112.1"）
/// - 病変種別の語彙
pub fn extract_key_medical_terms(text: &str) -> BTreeSet<String> {
    let mut terms = BTreeSet::new();

    for m in LOCATION_TERM_RE.find_iter(text) {
        terms.insert(collapse_whitespace(&m.as_str().to_lowercase()));
    }

    for cap in SIZE_TERM_RE.captures_iter(text) {
        terms.insert(format!("{} x {} cm", &cap[1], &cap[2]));
    }

    for cap in HU_TERM_RE.captures_iter(text) {
        terms.insert(format!("hu_{}", &cap[1]));
    }

    for (term, re) in LESION_TERM_RES.iter() {
        if re.is_match(text) {
            terms.insert(term.to_string());
        }
    }

    terms
}

/// Jaccard係数（共通部分 / 和集合）。和集合が空なら 0.0
pub fn jaccard_overlap(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

/// 2回の推論結果の一致度
///
/// どちらかの用語集合が空なら 0.0（空集合同士の一致は評価しない）。
/// 閾値以上なら 1.0、未満なら一致度そのものを返す。
pub fn verify_report_consistency(
    original_report: &str,
    verification_report: &str,
    threshold: f64,
) -> f64 {
    let original_terms = extract_key_medical_terms(original_report);
    let verification_terms = extract_key_medical_terms(verification_report);

    if original_terms.is_empty() || verification_terms.is_empty() {
        return 0.0;
    }

    let overlap = jaccard_overlap(&original_terms, &verification_terms);
    if overlap >= threshold {
        1.0
    } else {
        overlap.clamp(0.0, 1.0)
    }
}

/// キーフレーム番号の解析と一致度評価をまとめて実行
pub fn verify_key_frame(generated: &str, verification: &str, threshold: f64) -> KeyFrameVerification {
    let score = verify_report_consistency(generated, verification, threshold);
    match parse_key_slice_index(generated) {
        Ok(index) => KeyFrameVerification {
            index,
            score,
            index_error: None,
        },
        Err(e) => KeyFrameVerification {
            index: None,
            score,
            index_error: Some(e.to_string()),
        },
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
