mod binarize;
mod deqr;
mod finder;
mod raster;
mod symbol;
mod utils;

pub use deqr::decode_symbol;
pub use finder::FinderTriple;
pub use raster::RasterImage;
pub use symbol::SymbolGrid;
pub use utils::geometry::Point;

use tracing::{debug, trace};

use crate::common::codec::DecodedPayload;
use crate::common::error::{DecodeError, DecodeResult};
use crate::common::metadata::Version;
use binarize::BinaryGrid;
use deqr::read_version_field;
use finder::{locate_finders, rank_triples, select_triple};
use symbol::sample_grid;

// Triples tried before giving up, best fit first
const MAX_TRIPLE_ATTEMPTS: usize = 4;

// Pipeline stages
//------------------------------------------------------------------------------

/// Stages of a decode in the order they complete. A failed decode reports the
/// stage it could not produce through [`crate::DecodeError::stage`].
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Copy, Clone, Hash)]
pub enum DecodeStage {
    Sampled,
    FindersLocated,
    GridSampled,
    FormatKnown,
    Unmasked,
    ErrorCorrected,
    Decoded,
}

// Config
//------------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq, Copy, Clone, Default)]
pub enum Binarizer {
    /// Single global threshold picked by Otsu's method
    #[default]
    Otsu,
    /// Per 8x8 block threshold from the surrounding 5x5 blocks, for uneven lighting
    Adaptive,
}

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct DecoderConfig {
    binarizer: Binarizer,
    min_contrast: u8,
    max_candidates: usize,
    alignment_search: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self { binarizer: Binarizer::Otsu, min_contrast: 8, max_candidates: 16, alignment_search: true }
    }
}

impl DecoderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn binarizer(&mut self, binarizer: Binarizer) -> &mut Self {
        self.binarizer = binarizer;
        self
    }

    /// Images whose luminance spans less than this are rejected
    pub fn min_contrast(&mut self, min_contrast: u8) -> &mut Self {
        self.min_contrast = min_contrast;
        self
    }

    /// Finder candidates, strongest first, considered when pairing finders
    /// into triples
    pub fn max_candidates(&mut self, max_candidates: usize) -> &mut Self {
        self.max_candidates = max_candidates;
        self
    }

    pub fn alignment_search(&mut self, enabled: bool) -> &mut Self {
        self.alignment_search = enabled;
        self
    }

    pub fn get_binarizer(&self) -> Binarizer {
        self.binarizer
    }

    pub fn get_min_contrast(&self) -> u8 {
        self.min_contrast
    }

    pub fn get_max_candidates(&self) -> usize {
        self.max_candidates
    }

    pub fn get_alignment_search(&self) -> bool {
        self.alignment_search
    }
}

// Reader
//------------------------------------------------------------------------------

/// Decodes a single QR symbol from an image. Holds no state besides its
/// config, so one reader can be shared across threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct QRReader {
    config: DecoderConfig,
}

impl QRReader {
    pub fn new(config: DecoderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    pub fn decode<I: RasterImage + ?Sized>(&self, img: &I) -> DecodeResult<DecodedPayload> {
        let bin = self.binarize(img)?;
        let triples = self.rank_in(&bin)?;
        self.decode_ranked(&bin, &triples)
    }

    /// Runs the format, unmasking, error correction and payload stages on a
    /// grid sampled elsewhere
    pub fn decode_symbol(&self, grid: &SymbolGrid) -> DecodeResult<DecodedPayload> {
        decode_symbol(grid)
    }

    /// Finds the finder triple of the symbol in the image
    pub fn locate<I: RasterImage + ?Sized>(&self, img: &I) -> DecodeResult<FinderTriple> {
        let bin = self.binarize(img)?;
        self.best_in(&bin)
    }

    /// Locates the symbol and samples its module grid at the estimated version
    pub fn sample<I: RasterImage + ?Sized>(&self, img: &I) -> DecodeResult<SymbolGrid> {
        let bin = self.binarize(img)?;
        let triple = self.best_in(&bin)?;
        self.sample_at(&bin, &triple, triple.version)
    }

    fn binarize<I: RasterImage + ?Sized>(&self, img: &I) -> DecodeResult<BinaryGrid> {
        let bin = BinaryGrid::new(img, self.config.binarizer, self.config.min_contrast)?;
        debug!(width = bin.width(), height = bin.height(), binarizer = ?self.config.binarizer, "Sampled");
        Ok(bin)
    }

    fn rank_in(&self, bin: &BinaryGrid) -> DecodeResult<Vec<FinderTriple>> {
        let cands = locate_finders(bin);
        let triples = rank_triples(&cands, self.config.max_candidates)?;
        if let Some(best) = triples.first() {
            debug!(
                version = *best.version,
                module_size = best.module_size,
                angle = best.angle.to_degrees(),
                triples = triples.len(),
                "Finders located"
            );
        }
        Ok(triples)
    }

    fn best_in(&self, bin: &BinaryGrid) -> DecodeResult<FinderTriple> {
        let triple = select_triple(&locate_finders(bin), self.config.max_candidates)?;
        debug!(version = *triple.version, module_size = triple.module_size, "Finder triple selected");
        Ok(triple)
    }

    // Tries the best few triples in turn. When all fail, the error of the
    // attempt that got furthest down the pipeline is kept, the earliest on ties.
    fn decode_ranked(&self, bin: &BinaryGrid, triples: &[FinderTriple]) -> DecodeResult<DecodedPayload> {
        let mut furthest: Option<DecodeError> = None;
        for (i, triple) in triples.iter().take(MAX_TRIPLE_ATTEMPTS).enumerate() {
            match self.decode_triple(bin, triple) {
                Ok(payload) => return Ok(payload),
                Err(e) => {
                    trace!(triple = i, error = %e, "Triple rejected");
                    furthest = Some(further(furthest, e));
                }
            }
        }
        Err(furthest.unwrap_or(DecodeError::NoFinderPatterns))
    }

    // The finder spacing can be off by a version on blurry or warped images,
    // so the neighbours of the estimate are tried after it
    fn decode_triple(&self, bin: &BinaryGrid, triple: &FinderTriple) -> DecodeResult<DecodedPayload> {
        let est = *triple.version;
        let mut furthest: Option<DecodeError> = None;
        for v in [est, est + 1, est.saturating_sub(1)] {
            let ver = Version::new(v);
            if !ver.is_valid() {
                continue;
            }
            match self.sample_at(bin, triple, ver).and_then(|grid| decode_symbol(&grid)) {
                Ok(payload) => return Ok(payload),
                Err(e) => {
                    trace!(version = v, error = %e, "Version rejected");
                    furthest = Some(further(furthest, e));
                }
            }
        }
        Err(furthest.unwrap_or(DecodeError::StructuralMismatch))
    }

    // Samples at `ver` and, when the grid carries version info naming another
    // version, samples again at that one
    fn sample_at(&self, bin: &BinaryGrid, triple: &FinderTriple, ver: Version) -> DecodeResult<SymbolGrid> {
        let grid = sample_grid(bin, triple, ver, self.config.alignment_search)?;
        let grid = match read_version_field(&grid) {
            Ok(read) if read != ver => {
                debug!(estimated = *ver, read = *read, "Resampling at version info");
                sample_grid(bin, triple, read, self.config.alignment_search)?
            }
            _ => grid,
        };
        debug!(side = grid.side(), "Grid sampled");
        Ok(grid)
    }
}

fn further(prev: Option<DecodeError>, e: DecodeError) -> DecodeError {
    match prev {
        Some(p) if p.stage() >= e.stage() => p,
        _ => e,
    }
}

/// Decodes with the default config
pub fn decode<I: RasterImage + ?Sized>(img: &I) -> DecodeResult<DecodedPayload> {
    QRReader::default().decode(img)
}
