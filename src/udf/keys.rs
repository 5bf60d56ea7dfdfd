//! Row grouping by cache key and pipeline parameter

use std::collections::BTreeMap;

use super::{CacheKey, InputRow, Task};

/// Group rows by cache key
///
/// Keys come out sorted; rows keep their input order within a group.
pub fn partition<I>(rows: &[InputRow<I>]) -> Vec<(CacheKey, Vec<&InputRow<I>>)> {
    let mut groups: BTreeMap<&CacheKey, Vec<&InputRow<I>>> = BTreeMap::new();
    for row in rows {
        groups.entry(&row.key).or_default().push(row);
    }
    groups
        .into_iter()
        .map(|(key, rows)| (key.clone(), rows))
        .collect()
}

/// Group rows of one cache key by pipeline parameter, in ascending order
pub fn partition_by_param<'a, T: Task>(
    rows: &[&'a InputRow<T::Input>],
) -> Vec<(T::Param, Vec<&'a InputRow<T::Input>>)> {
    let mut groups: BTreeMap<T::Param, Vec<&'a InputRow<T::Input>>> = BTreeMap::new();
    for row in rows {
        groups.entry(T::param(&row.input)).or_default().push(*row);
    }
    groups.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::udf::{FillMask, FillMaskInput};

    fn row(model: &str, conn: &str, text: &str, top_k: u32) -> InputRow<FillMaskInput> {
        InputRow::new(
            CacheKey {
                model_name: model.to_string(),
                bucketfs_conn: conn.to_string(),
                sub_dir: "sub".to_string(),
                token_conn: None,
            },
            FillMaskInput {
                text_data: text.to_string(),
                top_k,
            },
        )
    }

    #[test]
    fn test_partition_sorted_disjoint_cover() {
        let rows = vec![
            row("model2", "conn1", "a", 1),
            row("model1", "conn2", "b", 1),
            row("model2", "conn1", "c", 1),
            row("model1", "conn1", "d", 1),
        ];

        let groups = partition(&rows);
        let summary: Vec<(&str, &str, Vec<&str>)> = groups
            .iter()
            .map(|(key, rows)| {
                (
                    key.model_name.as_str(),
                    key.bucketfs_conn.as_str(),
                    rows.iter().map(|r| r.input.text_data.as_str()).collect(),
                )
            })
            .collect();

        assert_eq!(
            summary,
            vec![
                ("model1", "conn1", vec!["d"]),
                ("model1", "conn2", vec!["b"]),
                ("model2", "conn1", vec!["a", "c"]),
            ]
        );
        let total: usize = groups.iter().map(|(_, rows)| rows.len()).sum();
        assert_eq!(total, rows.len());
    }

    #[test]
    fn test_token_connection_splits_groups() {
        let mut with_token = row("model1", "conn1", "b", 1);
        with_token.key.token_conn = Some("tok".to_string());
        let rows = vec![row("model1", "conn1", "a", 1), with_token];

        assert_eq!(partition(&rows).len(), 2);
    }

    #[test]
    fn test_partition_by_param_ascending() {
        let rows = vec![
            row("m", "c", "a", 3),
            row("m", "c", "b", 1),
            row("m", "c", "c", 3),
        ];
        let refs: Vec<&InputRow<FillMaskInput>> = rows.iter().collect();

        let groups = partition_by_param::<FillMask>(&refs);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, 1);
        assert_eq!(groups[1].0, 3);
        let texts: Vec<&str> = groups[1]
            .1
            .iter()
            .map(|r| r.input.text_data.as_str())
            .collect();
        assert_eq!(texts, vec!["a", "c"]);
    }

    #[test]
    fn test_empty_batch() {
        let rows: Vec<InputRow<FillMaskInput>> = Vec::new();
        assert!(partition(&rows).is_empty());
    }
}
