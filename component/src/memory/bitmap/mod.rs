//! 通用位图, 以 u32 为存储单元
//!
//! 空闲扇区表和物理页帧表都建立在它之上

const BITS_IN_WORD: usize = 32;
const BITS_IN_BYTE: usize = 8;

pub struct Bitmap {
    num_bits: usize,
    map: Vec<u32>,
}

impl Bitmap {
    /// 建立 num_bits 位的位图, 初始全部清零
    pub fn new(num_bits: usize) -> Self {
        assert!(num_bits > 0);
        let num_words = crate::util::div_round_up(num_bits, BITS_IN_WORD);
        Self {
            num_bits,
            map: vec![0; num_words],
        }
    }

    pub fn num_bits(&self) -> usize {
        self.num_bits
    }

    pub fn set(&mut self, which: usize) {
        assert!(which < self.num_bits);
        self.map[which / BITS_IN_WORD] |= 1 << (which % BITS_IN_WORD);
    }

    pub fn clear(&mut self, which: usize) {
        assert!(which < self.num_bits);
        self.map[which / BITS_IN_WORD] &= !(1 << (which % BITS_IN_WORD));
    }

    pub fn test(&self, which: usize) -> bool {
        assert!(which < self.num_bits);
        self.map[which / BITS_IN_WORD] & (1 << (which % BITS_IN_WORD)) != 0
    }

    /// 找到第一个清零位, 置位后返回其下标
    pub fn find_and_set(&mut self) -> Option<usize> {
        for which in 0..self.num_bits {
            if !self.test(which) {
                self.set(which);
                return Some(which);
            }
        }
        None
    }

    pub fn num_clear(&self) -> usize {
        (0..self.num_bits).filter(|&which| !self.test(which)).count()
    }

    /// 位图持久化所需的字节数
    pub fn num_bytes(&self) -> usize {
        crate::util::div_round_up(self.num_bits, BITS_IN_BYTE)
    }

    /// 导出为小端字节序列, 用于写回磁盘
    pub fn export(&self) -> Vec<u8> {
        let mut bytes: Vec<u8> = self.map.iter().flat_map(|word| word.to_le_bytes()).collect();
        bytes.truncate(self.num_bytes());
        bytes
    }

    /// 从小端字节序列恢复, 与 export 相逆
    pub fn import(&mut self, bytes: &[u8]) {
        assert!(bytes.len() >= self.num_bytes());
        for (i, word) in self.map.iter_mut().enumerate() {
            let mut raw = [0u8; 4];
            for (j, byte) in raw.iter_mut().enumerate() {
                *byte = bytes.get(i * 4 + j).copied().unwrap_or(0);
            }
            *word = u32::from_le_bytes(raw);
        }
    }

    /// 打印所有置位下标
    pub fn print(&self) {
        let set: Vec<String> = (0..self.num_bits)
            .filter(|&which| self.test(which))
            .map(|which| which.to_string())
            .collect();
        println!("Bitmap set bits: {}", set.join(", "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_clear_test() {
        let mut bitmap = Bitmap::new(100);
        assert!(!bitmap.test(7));
        bitmap.set(7);
        assert!(bitmap.test(7));
        bitmap.clear(7);
        assert!(!bitmap.test(7));
    }

    #[test]
    fn test_find_and_set_is_lowest_first() {
        let mut bitmap = Bitmap::new(8);
        assert_eq!(bitmap.find_and_set(), Some(0));
        assert_eq!(bitmap.find_and_set(), Some(1));
        bitmap.clear(0);
        assert_eq!(bitmap.find_and_set(), Some(0));
    }

    #[test]
    fn test_exhaustion() {
        let mut bitmap = Bitmap::new(3);
        for _ in 0..3 {
            assert!(bitmap.find_and_set().is_some());
        }
        assert_eq!(bitmap.find_and_set(), None);
        assert_eq!(bitmap.num_clear(), 0);
    }

    #[test]
    fn test_export_import_round_trip() {
        let mut bitmap = Bitmap::new(77);
        for which in [0, 13, 31, 32, 76] {
            bitmap.set(which);
        }
        let bytes = bitmap.export();
        assert_eq!(bytes.len(), bitmap.num_bytes());

        let mut other = Bitmap::new(77);
        other.import(&bytes);
        for which in 0..77 {
            assert_eq!(bitmap.test(which), other.test(which));
        }
    }
}
