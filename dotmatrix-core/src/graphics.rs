use crate::config::RunConfig;
use crate::ppu::{FrameBuffer, VideoSink, SCREEN_HEIGHT, SCREEN_WIDTH};
use sdl2::pixels::{Color, PixelFormatEnum};
use sdl2::render::{Texture, TextureCreator, TextureValueError, WindowCanvas};
use sdl2::video::{Window, WindowContext};
use sdl2::IntegerOrSdlError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GraphicsError {
    #[error("error creating renderer: {source}")]
    CreateRenderer {
        #[from]
        source: IntegerOrSdlError,
    },
    #[error("error creating frame texture: {source}")]
    CreateTexture {
        #[from]
        source: TextureValueError,
    },
}

// Shades 0-3 mapped linearly from white to black
const GB_SHADE_TO_RGB: [[u8; 3]; 4] =
    [[255, 255, 255], [170, 170, 170], [85, 85, 85], [0, 0, 0]];

/// Create an SDL2 renderer from the given window with the display area
/// initialized to all white pixels.
pub fn create_renderer(
    window: Window,
    run_config: &RunConfig,
) -> Result<WindowCanvas, GraphicsError> {
    let mut canvas_builder = window.into_canvas();
    if run_config.vsync_enabled {
        canvas_builder = canvas_builder.present_vsync();
    }

    let mut canvas = canvas_builder.build()?;

    canvas.set_draw_color(Color::RGB(255, 255, 255));
    canvas.clear();
    canvas.present();

    Ok(canvas)
}

/// Video sink that streams each completed frame into an SDL2 texture and
/// presents it.
pub struct SdlVideoSink<'a> {
    canvas: &'a mut WindowCanvas,
    texture: Texture<'a>,
}

impl<'a> SdlVideoSink<'a> {
    pub fn new(
        canvas: &'a mut WindowCanvas,
        texture_creator: &'a TextureCreator<WindowContext>,
    ) -> Result<Self, GraphicsError> {
        let texture = texture_creator.create_texture_streaming(
            PixelFormatEnum::RGB24,
            SCREEN_WIDTH as u32,
            SCREEN_HEIGHT as u32,
        )?;

        Ok(Self { canvas, texture })
    }
}

impl VideoSink for SdlVideoSink<'_> {
    // The sink contract returns no errors; SDL rendering failures are logged
    // and the frame is dropped
    fn swap(&mut self, frame: &FrameBuffer) {
        let result = self
            .texture
            .with_lock(None, frame_texture_updater(frame))
            .and_then(|()| {
                self.canvas.clear();
                self.canvas.copy(&self.texture, None, None)
            });

        match result {
            Ok(()) => {
                self.canvas.present();
            }
            Err(msg) => {
                log::error!("Failed to render frame: {msg}");
            }
        }
    }
}

fn frame_texture_updater(frame: &FrameBuffer) -> impl FnOnce(&mut [u8], usize) + '_ {
    move |pixels, pitch| {
        for (y, scanline) in frame.iter().enumerate() {
            for (x, shade) in scanline.iter().copied().enumerate() {
                let start = y * pitch + 3 * x;
                pixels[start..start + 3].copy_from_slice(&GB_SHADE_TO_RGB[usize::from(shade)]);
            }
        }
    }
}
