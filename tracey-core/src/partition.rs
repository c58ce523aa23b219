//! 連続する要素のグループ化

/// 同じキーを持つ連続した要素のグループ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group<K, T> {
    pub label: K,
    pub items: Vec<T>,
}

/// 要素列を、キーが等しい連続区間ごとのグループに分割する
///
/// 順序は保持され、離れた区間同士は統合されない。
pub fn partition<T, K, I, F>(items: I, key: F) -> Vec<Group<K, T>>
where
    I: IntoIterator<Item = T>,
    K: PartialEq,
    F: Fn(&T) -> K,
{
    let mut groups: Vec<Group<K, T>> = Vec::new();

    for item in items {
        let label = key(&item);
        match groups.last_mut() {
            Some(group) if group.label == label => group.items.push(item),
            _ => groups.push(Group {
                label,
                items: vec![item],
            }),
        }
    }

    groups
}
