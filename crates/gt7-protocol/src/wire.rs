// Little-endian field readers. Out-of-range reads yield zero; callers only
// read from buffers that have already been length-checked.

fn field<const N: usize>(data: &[u8], offset: usize) -> Option<[u8; N]> {
    let end = offset.checked_add(N)?;
    data.get(offset..end)?.try_into().ok()
}

pub(crate) fn read_u8(data: &[u8], offset: usize) -> u8 {
    data.get(offset).copied().unwrap_or(0)
}

pub(crate) fn read_u16(data: &[u8], offset: usize) -> u16 {
    field(data, offset).map(u16::from_le_bytes).unwrap_or(0)
}

pub(crate) fn read_i16(data: &[u8], offset: usize) -> i16 {
    field(data, offset).map(i16::from_le_bytes).unwrap_or(0)
}

pub(crate) fn read_u32(data: &[u8], offset: usize) -> u32 {
    field(data, offset).map(u32::from_le_bytes).unwrap_or(0)
}

pub(crate) fn read_i32(data: &[u8], offset: usize) -> i32 {
    field(data, offset).map(i32::from_le_bytes).unwrap_or(0)
}

pub(crate) fn read_f32(data: &[u8], offset: usize) -> f32 {
    field(data, offset).map(f32::from_le_bytes).unwrap_or(0.0)
}
