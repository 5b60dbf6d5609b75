//! CDDA playback pump
//!
//! The playback side drains the two halves of the CDDA buffer alternately. The pump refills
//! whichever half has been drained, one image block at a time, until playback stops or a read
//! fails.

use imgfile::IoResult;
use imgfile::audio::BufferHalf;
use imgfile::device::BlockDevice;
use imgfile::session::MediaSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CddaPlayer {
    playing: bool,
    filled: [bool; 2],
    next_fill: BufferHalf,
    next_play: BufferHalf,
}

impl Default for CddaPlayer {
    fn default() -> Self {
        Self {
            playing: false,
            filled: [false; 2],
            next_fill: BufferHalf::First,
            next_play: BufferHalf::First,
        }
    }
}

fn slot(half: BufferHalf) -> usize {
    match half {
        BufferHalf::First => 0,
        BufferHalf::Second => 1,
    }
}

impl CddaPlayer {
    /// Begin playback from the session's current CDDA position with both halves empty.
    pub fn start(&mut self) {
        *self = Self { playing: true, ..Self::default() };
    }

    pub fn stop(&mut self) {
        if self.playing {
            log::debug!("CDDA playback stopped");
        }
        *self = Self::default();
    }

    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Fill every drained half, first-drained first.
    ///
    /// # Errors
    ///
    /// Returns the read error that stopped playback.
    pub fn service<D: BlockDevice>(&mut self, session: &mut MediaSession<D>) -> IoResult<()> {
        while self.playing && !self.filled[slot(self.next_fill)] {
            if let Err(err) = session.read_next_audio_block(self.next_fill) {
                self.stop();
                return Err(err);
            }

            self.filled[slot(self.next_fill)] = true;
            self.next_fill = self.next_fill.other();
        }

        Ok(())
    }

    /// Half that playback should drain next, if it has been filled.
    #[must_use]
    pub fn ready_half(&self) -> Option<BufferHalf> {
        (self.playing && self.filled[slot(self.next_play)]).then_some(self.next_play)
    }

    /// Mark the half returned by [`Self::ready_half`] as drained.
    pub fn release_half(&mut self) {
        let slot = slot(self.next_play);
        if self.filled[slot] {
            self.filled[slot] = false;
            self.next_play = self.next_play.other();
        }
    }
}
