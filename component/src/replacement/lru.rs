use super::ReplacementStrategy;

/// LRU 置换: 记录每个元素最后一次使用的时刻, 淘汰最小者.
/// 权重由调用方提供 (内核传入当前 tick)
pub struct ReplacementLru {
    last_used: Vec<i64>,
}

impl ReplacementLru {
    pub fn new(size: usize) -> Self {
        assert!(size > 0);
        Self {
            last_used: vec![-1; size],
        }
    }
}

impl ReplacementStrategy for ReplacementLru {
    fn find_one_to_replace(&mut self) -> usize {
        let mut target = 0;
        for (id, &when) in self.last_used.iter().enumerate() {
            if when < self.last_used[target] {
                target = id;
            }
        }
        target
    }

    fn update_element_weight(&mut self, id: usize, weight: usize) {
        self.last_used[id] = weight as i64;
    }

    fn reset_status(&mut self) {
        self.last_used.fill(-1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replacement::ReplacementStrategy;

    #[test]
    fn test_picks_least_recently_used() {
        let mut lru = ReplacementLru::new(3);
        lru.update_element_weight(0, 30);
        lru.update_element_weight(1, 10);
        lru.update_element_weight(2, 20);
        assert_eq!(lru.find_one_to_replace(), 1);

        lru.update_element_weight(1, 40);
        assert_eq!(lru.find_one_to_replace(), 2);
    }

    #[test]
    fn test_reset_forgets_history() {
        let mut lru = ReplacementLru::new(2);
        lru.update_element_weight(0, 5);
        lru.reset_status();
        // 全部重置为 -1 后从最小下标选起
        assert_eq!(lru.find_one_to_replace(), 0);
    }
}
