use stowage_types::{sentinel, Access, Mode, Status};
use stowage_wire::records::{
    CountRequest, CountResponse, EraseRequest, EraseResponse, ExistsRequest, ExistsResponse,
    GetRequest, GetResponse, LengthRequest, LengthResponse, ListKeysRequest, ListKeysResponse,
    ListKeyValuesRequest, ListKeyValuesResponse, PutRequest, PutResponse,
};

use crate::provider::{validate_mode, Provider};

pub async fn count(provider: &Provider, _req: CountRequest) -> CountResponse {
    match provider.database.count().await {
        Ok(count) => CountResponse {
            status: Status::Ok.into(),
            count,
        },
        Err(status) => CountResponse {
            status: status.into(),
            count: 0,
        },
    }
}

pub async fn put(provider: &Provider, req: PutRequest) -> PutResponse {
    let mode = Mode::from_bits_truncate(req.mode);
    if let Err(status) = validate_mode(provider.database.as_ref(), mode) {
        return PutResponse {
            status: status.into(),
        };
    }
    if let Err(status) = stowage_types::validate_keys(req.keys.iter().map(Vec::as_slice)) {
        return PutResponse {
            status: status.into(),
        };
    }

    let total_bytes: usize = req.keys.iter().map(Vec::len).sum::<usize>()
        + req.values.iter().map(Vec::len).sum::<usize>();
    let pairs: Vec<_> = req.keys.into_iter().zip(req.values).collect();

    // Acquire-then-release brackets the operation the way the cache
    // policies expect, even though the bytes themselves already live in
    // the decoded request record.
    provider.with_scratch_buffer(total_bytes, Access::Write, || ());

    match provider.database.put(mode, &pairs).await {
        Ok(()) => PutResponse {
            status: Status::Ok.into(),
        },
        Err(status) => PutResponse {
            status: status.into(),
        },
    }
}

pub async fn get(provider: &Provider, req: GetRequest) -> GetResponse {
    let mode = Mode::from_bits_truncate(req.mode);
    if let Err(status) = validate_mode(provider.database.as_ref(), mode) {
        return GetResponse {
            status: status.into(),
            value_sizes: Vec::new(),
            values: Vec::new(),
        };
    }
    if let Err(status) = stowage_types::validate_keys(req.keys.iter().map(Vec::as_slice)) {
        return GetResponse {
            status: status.into(),
            value_sizes: Vec::new(),
            values: Vec::new(),
        };
    }

    match provider.database.get(mode, &req.keys).await {
        Ok(values) => {
            let packed = mode.contains(Mode::PACKED);
            let (sizes, payload) =
                layout_get_output(&values, &req.value_sizes, packed, req.packed_buffer_size);
            GetResponse {
                status: Status::Ok.into(),
                value_sizes: sizes,
                values: payload,
            }
        }
        Err(status) => GetResponse {
            status: status.into(),
            value_sizes: Vec::new(),
            values: Vec::new(),
        },
    }
}

/// Packed layout concatenates every returned value back to back against a
/// caller-supplied aggregate budget, writing `BUF_TOO_SMALL` for whichever
/// value would push the running concatenation past it; fixed-slot layout
/// reserves `value_sizes[i]` bytes per key and writes `BUF_TOO_SMALL`
/// where that one value doesn't fit.
fn layout_get_output(
    values: &[Option<Vec<u8>>],
    slot_sizes: &[u64],
    packed: bool,
    packed_buffer_size: u64,
) -> (Vec<u64>, Vec<u8>) {
    let mut sizes = Vec::with_capacity(values.len());
    let mut payload = Vec::new();
    let mut packed_used: u64 = 0;

    for (index, value) in values.iter().enumerate() {
        let slot = slot_sizes.get(index).copied().unwrap_or(0) as usize;
        match value {
            None => {
                sizes.push(sentinel::KEY_NOT_FOUND);
                if !packed {
                    payload.resize(payload.len() + slot, 0);
                }
            }
            Some(bytes) if packed => {
                let size = bytes.len() as u64;
                if packed_used + size > packed_buffer_size {
                    sizes.push(sentinel::BUF_TOO_SMALL);
                } else {
                    sizes.push(size);
                    payload.extend_from_slice(bytes);
                    packed_used += size;
                }
            }
            Some(bytes) if bytes.len() > slot => {
                sizes.push(sentinel::BUF_TOO_SMALL);
                payload.resize(payload.len() + slot, 0);
            }
            Some(bytes) => {
                sizes.push(bytes.len() as u64);
                payload.extend_from_slice(bytes);
                payload.resize(payload.len() + (slot - bytes.len()), 0);
            }
        }
    }
    (sizes, payload)
}

pub async fn length(provider: &Provider, req: LengthRequest) -> LengthResponse {
    let mode = Mode::from_bits_truncate(req.mode);
    if let Err(status) = validate_mode(provider.database.as_ref(), mode) {
        return LengthResponse {
            status: status.into(),
            value_sizes: Vec::new(),
        };
    }
    match provider.database.length(mode, &req.keys).await {
        Ok(sizes) => LengthResponse {
            status: Status::Ok.into(),
            value_sizes: sizes
                .into_iter()
                .map(|size| size.unwrap_or(sentinel::KEY_NOT_FOUND))
                .collect(),
        },
        Err(status) => LengthResponse {
            status: status.into(),
            value_sizes: Vec::new(),
        },
    }
}

pub async fn exists(provider: &Provider, req: ExistsRequest) -> ExistsResponse {
    let mode = Mode::from_bits_truncate(req.mode);
    if let Err(status) = validate_mode(provider.database.as_ref(), mode) {
        return ExistsResponse {
            status: status.into(),
            bitfield: Vec::new(),
        };
    }
    match provider.database.exists(mode, &req.keys).await {
        Ok(flags) => {
            let mut bitfield = vec![0u8; flags.len().div_ceil(8)];
            for (index, present) in flags.into_iter().enumerate() {
                if present {
                    bitfield[index / 8] |= 1 << (index % 8);
                }
            }
            ExistsResponse {
                status: Status::Ok.into(),
                bitfield,
            }
        }
        Err(status) => ExistsResponse {
            status: status.into(),
            bitfield: Vec::new(),
        },
    }
}

pub async fn erase(provider: &Provider, req: EraseRequest) -> EraseResponse {
    let mode = Mode::from_bits_truncate(req.mode);
    if let Err(status) = validate_mode(provider.database.as_ref(), mode) {
        return EraseResponse {
            status: status.into(),
        };
    }
    match provider.database.erase(mode, &req.keys).await {
        Ok(()) => EraseResponse {
            status: Status::Ok.into(),
        },
        Err(status) => EraseResponse {
            status: status.into(),
        },
    }
}

pub async fn list_keys(provider: &Provider, req: ListKeysRequest) -> ListKeysResponse {
    let mode = Mode::from_bits_truncate(req.mode);
    if let Err(status) = validate_mode(provider.database.as_ref(), mode) {
        return ListKeysResponse {
            status: status.into(),
            keys: Vec::new(),
        };
    }
    let filter = match stowage_filter::build_key_value_filter(mode, &req.filter_param) {
        Ok(filter) => filter,
        Err(status) => {
            return ListKeysResponse {
                status: status.into(),
                keys: Vec::new(),
            }
        }
    };
    match provider
        .database
        .list_keys(mode, &req.from_key, req.max, filter.as_ref())
        .await
    {
        Ok(entries) => ListKeysResponse {
            status: Status::Ok.into(),
            keys: entries.into_iter().map(|entry| entry.key).collect(),
        },
        Err(status) => ListKeysResponse {
            status: status.into(),
            keys: Vec::new(),
        },
    }
}

pub async fn list_key_values(
    provider: &Provider,
    req: ListKeyValuesRequest,
) -> ListKeyValuesResponse {
    let mode = Mode::from_bits_truncate(req.mode);
    if let Err(status) = validate_mode(provider.database.as_ref(), mode) {
        return ListKeyValuesResponse {
            status: status.into(),
            keys: Vec::new(),
            values: Vec::new(),
        };
    }
    let filter = match stowage_filter::build_key_value_filter(mode, &req.filter_param) {
        Ok(filter) => filter,
        Err(status) => {
            return ListKeyValuesResponse {
                status: status.into(),
                keys: Vec::new(),
                values: Vec::new(),
            }
        }
    };
    match provider
        .database
        .list_key_values(mode, &req.from_key, req.max, filter.as_ref())
        .await
    {
        Ok(entries) => {
            let keys_only = mode.contains(Mode::KEYS_ONLY);
            let ignore_keys = mode.contains(Mode::IGNORE_KEYS);
            let mut keys = Vec::new();
            let mut values = Vec::new();
            for entry in entries {
                if !ignore_keys {
                    keys.push(entry.key);
                }
                if !keys_only {
                    values.push(entry.value.unwrap_or_default());
                }
            }
            ListKeyValuesResponse {
                status: Status::Ok.into(),
                keys,
                values,
            }
        }
        Err(status) => ListKeyValuesResponse {
            status: status.into(),
            keys: Vec::new(),
            values: Vec::new(),
        },
    }
}
