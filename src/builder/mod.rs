mod qr;

pub use qr::{Module, QR};

use std::ops::Deref;

use tracing::debug;

use crate::common::{
    bitstream::BitStream,
    codec::{encode, encode_with_version},
    ec::{ec_capacity, ecc},
    error::{QRError, QRResult},
    mask::{apply_best_mask, MaskPattern},
    metadata::{ECLevel, Version},
};

/// Companion encoder the reader is verified against
pub struct QRBuilder<'a> {
    data: &'a [u8],
    version: Option<Version>,
    ec_level: ECLevel,
    mask: Option<MaskPattern>,
}

impl<'a> QRBuilder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, version: None, ec_level: ECLevel::M, mask: None }
    }

    pub fn data(&mut self, data: &'a [u8]) -> &mut Self {
        self.data = data;
        self
    }

    pub fn version(&mut self, version: Version) -> &mut Self {
        self.version = Some(version);
        self
    }

    pub fn unset_version(&mut self) -> &mut Self {
        self.version = None;
        self
    }

    pub fn ec_level(&mut self, ec_level: ECLevel) -> &mut Self {
        self.ec_level = ec_level;
        self
    }

    pub fn mask(&mut self, mask: MaskPattern) -> &mut Self {
        self.mask = Some(mask);
        self
    }

    pub fn unset_mask(&mut self) -> &mut Self {
        self.mask = None;
        self
    }

    pub fn metadata(&self) -> String {
        let ver = self.version.map_or("None".to_string(), |v| v.to_string());
        let mask = self.mask.map_or("None".to_string(), |m| m.to_string());
        format!("{{ Version: {ver}, Ec level: {:?}, Mask: {mask} }}", self.ec_level)
    }
}


impl QRBuilder<'_> {
    pub fn build(&self) -> QRResult<QR> {
        debug!("Generating QR {}", self.metadata());
        if self.data.is_empty() {
            return Err(QRError::EmptyData);
        }
        if self.version.is_some_and(|v| !v.is_valid()) {
            return Err(QRError::InvalidVersion);
        }

        // Encode data optimally
        let (encoded_data, version) = match self.version {
            Some(v) => (encode_with_version(self.data, v, self.ec_level)?, v),
            None => encode(self.data, self.ec_level)?,
        };
        debug!(version = *version, bits = encoded_data.len(), "Data encoded");

        let payload = Self::build_payload(&encoded_data, version, self.ec_level);

        let mut qr = QR::new(version, self.ec_level);
        qr.draw_all_function_patterns();
        qr.draw_encoding_region(payload);

        let mask = match self.mask {
            Some(m) => {
                qr.apply_mask(m);
                m
            }
            None => apply_best_mask(&mut qr),
        };

        let total_modules = version.width() * version.width();
        debug!(
            metadata = %qr.metadata(),
            mask = *mask,
            data_capacity = version.data_codewords(self.ec_level),
            ec_capacity = ec_capacity(version, self.ec_level),
            balance = qr.count_dark_modules() * 100 / total_modules,
            "QR generated"
        );

        Ok(qr)
    }

    // Interleaves data codewords followed by ecc codewords
    fn build_payload(encoded_data: &BitStream, version: Version, ec_level: ECLevel) -> BitStream {
        let blocks = ecc(encoded_data.data(), version, ec_level);
        let data_blocks = blocks.iter().map(|b| b.data()).collect::<Vec<_>>();
        let ecc_blocks = blocks.iter().map(|b| b.ecc()).collect::<Vec<_>>();

        let mut payload = BitStream::new(version.total_codewords() << 3);
        payload.extend(&Self::interleave(&data_blocks));
        payload.extend(&Self::interleave(&ecc_blocks));
        payload
    }

    pub fn interleave<T: Copy, V: Deref<Target = [T]>>(blocks: &[V]) -> Vec<T> {
        let max_block_size = blocks.iter().map(|b| b.len()).max().unwrap_or(0);
        let total_size = blocks.iter().map(|b| b.len()).sum::<usize>();
        let mut res = Vec::with_capacity(total_size);
        for i in 0..max_block_size {
            for b in blocks {
                if i < b.len() {
                    res.push(b[i]);
                }
            }
        }
        res
    }
}
