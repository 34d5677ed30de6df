//! 以 DashMap 實作的單一集合
//!
//! 每筆記錄帶插入序號，列表一律依插入順序回傳；有業務唯一鍵的記錄
//! 透過 entry API 原子佔用鍵值。

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use icms_core::{ActualLoading, FxRate, IcmsError, ImportOrder, Payment, Port, Result, Sku, Supplier};
use uuid::Uuid;

/// 可存入集合的記錄
pub trait Record: Clone + Send + Sync {
    /// 錯誤訊息中使用的實體名稱
    const ENTITY: &'static str;

    fn id(&self) -> Uuid;

    /// 業務唯一鍵（無則回傳 None）
    fn unique_key(&self) -> Option<String> {
        None
    }
}

struct Stored<T> {
    seq: u64,
    record: T,
}

/// 單一類型的記錄集合
pub struct Collection<T: Record> {
    records: DashMap<Uuid, Stored<T>>,
    keys: DashMap<String, Uuid>,
    sequence: AtomicU64,
}

impl<T: Record> Collection<T> {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            keys: DashMap::new(),
            sequence: AtomicU64::new(0),
        }
    }

    /// 插入新記錄；ID 或唯一鍵重複時回傳 Conflict
    pub fn insert(&self, record: T) -> Result<T> {
        let id = record.id();

        match record.unique_key() {
            Some(key) => match self.keys.entry(key) {
                Entry::Occupied(occupied) => Err(IcmsError::Conflict(format!(
                    "{} {} 已存在",
                    T::ENTITY,
                    occupied.key()
                ))),
                Entry::Vacant(vacant) => {
                    let stored = self.store_new(record)?;
                    vacant.insert(id);
                    Ok(stored)
                }
            },
            None => self.store_new(record),
        }
    }

    fn store_new(&self, record: T) -> Result<T> {
        match self.records.entry(record.id()) {
            Entry::Occupied(_) => Err(IcmsError::Conflict(format!("{} {} 已存在", T::ENTITY, record.id()))),
            Entry::Vacant(vacant) => {
                let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
                vacant.insert(Stored {
                    seq,
                    record: record.clone(),
                });
                Ok(record)
            }
        }
    }

    pub fn get(&self, id: Uuid) -> Option<T> {
        self.records.get(&id).map(|stored| stored.record.clone())
    }

    /// 依插入順序列出所有記錄
    pub fn list(&self) -> Vec<T> {
        let mut entries: Vec<(u64, T)> = self
            .records
            .iter()
            .map(|stored| (stored.seq, stored.record.clone()))
            .collect();
        entries.sort_by_key(|(seq, _)| *seq);
        entries.into_iter().map(|(_, record)| record).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 取代既有記錄（保留插入序號）
    pub fn replace(&self, record: T) -> Result<T> {
        self.replace_with(record, |_, _| {})
    }

    /// 取代既有記錄，`carry` 可在寫入前從舊記錄帶入欄位
    ///
    /// 唯一鍵變更時先佔用新鍵，寫入成功後才釋放舊鍵。
    pub fn replace_with(&self, mut record: T, carry: impl FnOnce(&T, &mut T)) -> Result<T> {
        let id = record.id();
        let old_key = self
            .records
            .get(&id)
            .map(|stored| stored.record.unique_key())
            .ok_or_else(|| IcmsError::not_found(T::ENTITY, id))?;
        let new_key = record.unique_key();

        if new_key != old_key {
            if let Some(key) = &new_key {
                match self.keys.entry(key.clone()) {
                    Entry::Occupied(occupied) if *occupied.get() != id => {
                        return Err(IcmsError::Conflict(format!("{} {} 已存在", T::ENTITY, key)));
                    }
                    Entry::Occupied(_) => {}
                    Entry::Vacant(vacant) => {
                        vacant.insert(id);
                    }
                }
            }
        }

        let updated = match self.records.get_mut(&id) {
            Some(mut stored) => {
                carry(&stored.record, &mut record);
                stored.record = record.clone();
                record
            }
            None => {
                if let Some(key) = &new_key {
                    self.keys.remove_if(key, |_, owner| *owner == id);
                }
                return Err(IcmsError::not_found(T::ENTITY, id));
            }
        };

        if new_key != old_key {
            if let Some(key) = &old_key {
                self.keys.remove_if(key, |_, owner| *owner == id);
            }
        }

        Ok(updated)
    }

    /// 在分片鎖內原地修改記錄
    pub fn modify<R>(&self, id: Uuid, f: impl FnOnce(&mut T) -> Result<R>) -> Result<R> {
        let mut stored = self
            .records
            .get_mut(&id)
            .ok_or_else(|| IcmsError::not_found(T::ENTITY, id))?;
        f(&mut stored.record)
    }

    pub fn remove(&self, id: Uuid) -> Result<T> {
        let (_, stored) = self
            .records
            .remove(&id)
            .ok_or_else(|| IcmsError::not_found(T::ENTITY, id))?;

        if let Some(key) = stored.record.unique_key() {
            self.keys.remove_if(&key, |_, owner| *owner == id);
        }

        Ok(stored.record)
    }
}

impl<T: Record> Default for Collection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl Record for Sku {
    const ENTITY: &'static str = "sku";

    fn id(&self) -> Uuid {
        self.id
    }

    fn unique_key(&self) -> Option<String> {
        Some(self.sku_code.clone())
    }
}

impl Record for Supplier {
    const ENTITY: &'static str = "supplier";

    fn id(&self) -> Uuid {
        self.id
    }

    fn unique_key(&self) -> Option<String> {
        Some(self.code.clone())
    }
}

impl Record for Port {
    const ENTITY: &'static str = "port";

    fn id(&self) -> Uuid {
        self.id
    }

    fn unique_key(&self) -> Option<String> {
        Some(self.code.clone())
    }
}

impl Record for ImportOrder {
    const ENTITY: &'static str = "order";

    fn id(&self) -> Uuid {
        self.id
    }

    fn unique_key(&self) -> Option<String> {
        Some(self.po_number.clone())
    }
}

impl Record for Payment {
    const ENTITY: &'static str = "payment";

    fn id(&self) -> Uuid {
        self.id
    }
}

impl Record for FxRate {
    const ENTITY: &'static str = "fx_rate";

    fn id(&self) -> Uuid {
        self.id
    }
}

// 每張訂單最多一筆裝櫃記錄
impl Record for ActualLoading {
    const ENTITY: &'static str = "loading";

    fn id(&self) -> Uuid {
        self.id
    }

    fn unique_key(&self) -> Option<String> {
        Some(self.order_id.to_string())
    }
}
