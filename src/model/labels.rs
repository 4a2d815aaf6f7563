// 该文件是 Shibie （识别） 项目的一部分。
// src/model/labels.rs - 类别标签表
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

/// COCO 数据集类别名称
#[rustfmt::skip]
pub const COCO_CLASSES: [&str; 80] = [
  "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
  "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat", "dog",
  "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack", "umbrella",
  "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball", "kite",
  "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket", "bottle",
  "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich", "orange",
  "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch", "potted plant",
  "bed", "dining table", "toilet", "tv", "laptop", "mouse", "remote", "keyboard", "cell phone",
  "microwave", "oven", "toaster", "sink", "refrigerator", "book", "clock", "vase", "scissors",
  "teddy bear", "hair drier", "toothbrush",
];

pub fn coco_labels() -> Vec<String> {
  COCO_CLASSES.iter().map(|name| name.to_string()).collect()
}

/// 解析 ultralytics 导出时写入 ONNX 元数据的 `names` 字段，
/// 形如 `{0: 'person', 1: 'bicycle'}`。
///
/// id 必须从 0 开始连续，否则返回 `None`。
pub fn parse_names_metadata(raw: &str) -> Option<Vec<String>> {
  let body = raw.trim().strip_prefix('{')?.strip_suffix('}')?;
  if body.trim().is_empty() {
    return None;
  }

  // 类别名本身可能含逗号，只在 `, <id>:` 处切分条目
  let mut raw_entries: Vec<String> = Vec::new();
  for piece in body.split(',') {
    match raw_entries.last_mut() {
      Some(last) if !starts_with_id(piece) => {
        last.push(',');
        last.push_str(piece);
      }
      _ => raw_entries.push(piece.to_string()),
    }
  }

  let mut entries = Vec::new();
  for entry in &raw_entries {
    let (id, name) = entry.split_once(':')?;
    let id: usize = id.trim().parse().ok()?;
    let name = name.trim().trim_matches(|c| c == '\'' || c == '"');
    entries.push((id, name.to_string()));
  }

  entries.sort_by_key(|(id, _)| *id);
  entries
    .iter()
    .enumerate()
    .all(|(expected, (id, _))| expected == *id)
    .then(|| entries.into_iter().map(|(_, name)| name).collect())
}

fn starts_with_id(piece: &str) -> bool {
  piece.split_once(':').is_some_and(|(id, _)| {
    let id = id.trim();
    !id.is_empty() && id.chars().all(|c| c.is_ascii_digit())
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_ultralytics_names() {
    let names = parse_names_metadata("{0: 'person', 2: 'car', 1: 'bicycle'}").unwrap();
    assert_eq!(names, ["person", "bicycle", "car"]);
  }

  #[test]
  fn parses_names_with_spaces() {
    let names = parse_names_metadata("{0: 'traffic light', 1: \"stop sign\"}").unwrap();
    assert_eq!(names, ["traffic light", "stop sign"]);
  }

  #[test]
  fn keeps_commas_inside_names() {
    let names = parse_names_metadata("{0: 'person', 1: 'hat, red', 2: 'car'}").unwrap();
    assert_eq!(names, ["person", "hat, red", "car"]);
  }

  #[test]
  fn rejects_gaps_and_garbage() {
    assert_eq!(parse_names_metadata("{0: 'a', 2: 'c'}"), None);
    assert_eq!(parse_names_metadata("person, car"), None);
    assert_eq!(parse_names_metadata("{}"), None);
    assert_eq!(parse_names_metadata("{x: 'a'}"), None);
  }

  #[test]
  fn coco_table_has_80_classes() {
    let labels = coco_labels();
    assert_eq!(labels.len(), 80);
    assert_eq!(labels[0], "person");
    assert_eq!(labels[79], "toothbrush");
  }
}
