//! Win32 presentation: a click-through layered popup fed through `UpdateLayeredWindow`.

use std::mem;
use std::ptr;
use std::sync::Once;

use windows::core::PCWSTR;
use windows::Win32::Foundation::{COLORREF, HANDLE, HWND, LPARAM, LRESULT, POINT, SIZE, WPARAM};
use windows::Win32::Graphics::Gdi::{
    CreateCompatibleDC, CreateDIBSection, DeleteDC, DeleteObject, GetDC, ReleaseDC, SelectObject,
    AC_SRC_ALPHA, AC_SRC_OVER, BITMAPINFO, BITMAPINFOHEADER, BI_RGB, BLENDFUNCTION,
    DIB_RGB_COLORS, HBITMAP, HDC, HGDIOBJ,
};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::WindowsAndMessaging::{
    CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW, GetSystemMetrics,
    PeekMessageW, RegisterClassW, SetWindowPos, ShowWindow, TranslateMessage, UpdateLayeredWindow,
    HWND_TOPMOST, MSG, PM_REMOVE, SM_CXVIRTUALSCREEN, SM_CYVIRTUALSCREEN, SM_XVIRTUALSCREEN,
    SM_YVIRTUALSCREEN, SWP_NOACTIVATE, SW_SHOWNOACTIVATE, ULW_ALPHA, WINDOW_EX_STYLE,
    WINDOW_STYLE, WNDCLASSW, WS_EX_LAYERED, WS_EX_NOACTIVATE, WS_EX_TOOLWINDOW, WS_EX_TOPMOST,
    WS_EX_TRANSPARENT, WS_POPUP,
};

use crate::overlay::error::{OverlayError, OverlayResult};
use crate::overlay::model::OverlayBounds;
use crate::overlay::present::{OverlayBackend, PresentationSurface};
use crate::overlay::surface::PixelSurface;

const WINDOW_CLASS_NAME: &str = "OverlayHostRecordingOverlay";

pub fn overlay_window_ex_style() -> WINDOW_EX_STYLE {
    WS_EX_LAYERED | WS_EX_TOPMOST | WS_EX_TOOLWINDOW | WS_EX_TRANSPARENT | WS_EX_NOACTIVATE
}

fn widestring(value: &str) -> Vec<u16> {
    use std::os::windows::ffi::OsStrExt;
    std::ffi::OsStr::new(value)
        .encode_wide()
        .chain(std::iter::once(0))
        .collect()
}

fn presentation_error(context: &str, err: impl std::fmt::Display) -> OverlayError {
    OverlayError::Presentation(format!("{context}: {err}"))
}

unsafe extern "system" fn overlay_wndproc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) }
}

#[derive(Debug, Default)]
pub struct LayeredWindowBackend;

impl LayeredWindowBackend {
    pub fn new() -> Self {
        Self
    }
}

impl OverlayBackend for LayeredWindowBackend {
    fn is_supported(&self) -> bool {
        true
    }

    fn virtual_screen_bounds(&self) -> OverlayBounds {
        unsafe {
            OverlayBounds::new(
                GetSystemMetrics(SM_XVIRTUALSCREEN),
                GetSystemMetrics(SM_YVIRTUALSCREEN),
                GetSystemMetrics(SM_CXVIRTUALSCREEN),
                GetSystemMetrics(SM_CYVIRTUALSCREEN),
            )
        }
    }

    fn create_presenter(&mut self) -> OverlayResult<Box<dyn PresentationSurface>> {
        Ok(Box::new(LayeredWindowPresenter::default()))
    }

    fn pump_messages(&mut self) {
        unsafe {
            let mut msg = MSG::default();
            while PeekMessageW(&mut msg, HWND::default(), 0, 0, PM_REMOVE).into() {
                let _ = TranslateMessage(&msg);
                let _ = DispatchMessageW(&msg);
            }
        }
    }
}

/// Layered popup window plus the DIB section `UpdateLayeredWindow` reads from.
pub struct LayeredWindowPresenter {
    hwnd: HWND,
    mem_dc: HDC,
    dib: HBITMAP,
    old_bitmap: HGDIOBJ,
    bits: *mut u8,
    size: (i32, i32),
    origin: (i32, i32),
    visible: bool,
}

impl Default for LayeredWindowPresenter {
    fn default() -> Self {
        Self {
            hwnd: HWND::default(),
            mem_dc: HDC::default(),
            dib: HBITMAP::default(),
            old_bitmap: HGDIOBJ::default(),
            bits: ptr::null_mut(),
            size: (0, 0),
            origin: (0, 0),
            visible: false,
        }
    }
}

impl LayeredWindowPresenter {
    fn create_window(&mut self, bounds: OverlayBounds) -> OverlayResult<()> {
        static REGISTER_CLASS: Once = Once::new();
        let class_name = widestring(WINDOW_CLASS_NAME);
        let hinstance = unsafe { GetModuleHandleW(PCWSTR::null()) }
            .map_err(|err| presentation_error("resolve module handle", err))?;

        REGISTER_CLASS.call_once(|| unsafe {
            let wc = WNDCLASSW {
                hInstance: hinstance.into(),
                lpszClassName: PCWSTR(class_name.as_ptr()),
                lpfnWndProc: Some(overlay_wndproc),
                ..Default::default()
            };
            let _ = RegisterClassW(&wc);
        });

        self.hwnd = unsafe {
            CreateWindowExW(
                overlay_window_ex_style(),
                PCWSTR(class_name.as_ptr()),
                PCWSTR::null(),
                WINDOW_STYLE(WS_POPUP.0),
                bounds.x,
                bounds.y,
                bounds.width,
                bounds.height,
                None,
                None,
                hinstance,
                None,
            )
        }
        .map_err(|err| presentation_error("create overlay window", err))?;
        self.origin = (bounds.x, bounds.y);
        tracing::debug!(width = bounds.width, height = bounds.height, "overlay window created");
        Ok(())
    }

    fn create_dib(&mut self, width: i32, height: i32) -> OverlayResult<()> {
        self.release_dib();

        let mem_dc = unsafe { CreateCompatibleDC(HDC::default()) };
        if mem_dc.0.is_null() {
            return Err(OverlayError::Presentation(
                "create memory device context".into(),
            ));
        }
        self.mem_dc = mem_dc;

        let mut bmi = BITMAPINFO::default();
        bmi.bmiHeader = BITMAPINFOHEADER {
            biSize: mem::size_of::<BITMAPINFOHEADER>() as u32,
            biWidth: width,
            biHeight: -height,
            biPlanes: 1,
            biBitCount: 32,
            biCompression: BI_RGB.0,
            ..Default::default()
        };

        let mut bits: *mut core::ffi::c_void = ptr::null_mut();
        let dib = unsafe {
            CreateDIBSection(mem_dc, &bmi, DIB_RGB_COLORS, &mut bits, HANDLE::default(), 0)
        }
        .map_err(|err| presentation_error("create DIB section", err))?;
        if bits.is_null() {
            unsafe {
                let _ = DeleteObject(dib);
            }
            return Err(OverlayError::Presentation("DIB section has no pixels".into()));
        }

        self.old_bitmap = unsafe { SelectObject(mem_dc, dib) };
        self.dib = dib;
        self.bits = bits as *mut u8;
        self.size = (width, height);
        Ok(())
    }

    fn release_dib(&mut self) {
        unsafe {
            if !self.mem_dc.0.is_null() && !self.old_bitmap.0.is_null() {
                let _ = SelectObject(self.mem_dc, self.old_bitmap);
            }
            if !self.dib.0.is_null() {
                let _ = DeleteObject(self.dib);
            }
            if !self.mem_dc.0.is_null() {
                let _ = DeleteDC(self.mem_dc);
            }
        }
        self.dib = HBITMAP::default();
        self.mem_dc = HDC::default();
        self.old_bitmap = HGDIOBJ::default();
        self.bits = ptr::null_mut();
        self.size = (0, 0);
    }

    fn ensure_inner(&mut self, bounds: OverlayBounds) -> OverlayResult<()> {
        if self.hwnd.0.is_null() {
            self.create_window(bounds)?;
        } else if self.origin != (bounds.x, bounds.y) || self.size != (bounds.width, bounds.height)
        {
            unsafe {
                SetWindowPos(
                    self.hwnd,
                    HWND_TOPMOST,
                    bounds.x,
                    bounds.y,
                    bounds.width,
                    bounds.height,
                    SWP_NOACTIVATE,
                )
            }
            .map_err(|err| presentation_error("move overlay window", err))?;
            self.origin = (bounds.x, bounds.y);
        }

        if self.size != (bounds.width, bounds.height) || self.bits.is_null() {
            self.create_dib(bounds.width, bounds.height)?;
        }
        Ok(())
    }
}

impl PresentationSurface for LayeredWindowPresenter {
    fn ensure(&mut self, bounds: OverlayBounds) -> OverlayResult<()> {
        if !bounds.is_valid() {
            return Err(OverlayError::InvalidSize {
                width: bounds.width,
                height: bounds.height,
            });
        }
        let result = self.ensure_inner(bounds);
        if result.is_err() {
            self.release();
        }
        result
    }

    fn present(&mut self, surface: &PixelSurface) -> OverlayResult<()> {
        let (width, height) = surface.size();
        if self.bits.is_null() || self.size != (width as i32, height as i32) {
            return Err(OverlayError::Presentation(
                "surface does not match overlay window".into(),
            ));
        }

        // Both buffers are top-down premultiplied BGRA with no row padding.
        let dst = unsafe { std::slice::from_raw_parts_mut(self.bits, surface.pixels().len()) };
        dst.copy_from_slice(surface.pixels());

        let dst_point = POINT {
            x: self.origin.0,
            y: self.origin.1,
        };
        let src_point = POINT { x: 0, y: 0 };
        let size = SIZE {
            cx: self.size.0,
            cy: self.size.1,
        };
        let blend = BLENDFUNCTION {
            BlendOp: AC_SRC_OVER as u8,
            BlendFlags: 0,
            SourceConstantAlpha: 255,
            AlphaFormat: AC_SRC_ALPHA as u8,
        };

        let result = unsafe {
            let screen_dc = GetDC(HWND::default());
            let result = UpdateLayeredWindow(
                self.hwnd,
                screen_dc,
                Some(&dst_point as *const POINT),
                Some(&size as *const SIZE),
                self.mem_dc,
                Some(&src_point as *const POINT),
                COLORREF(0),
                Some(&blend as *const BLENDFUNCTION),
                ULW_ALPHA,
            );
            let _ = ReleaseDC(HWND::default(), screen_dc);
            result
        };
        result.map_err(|err| presentation_error("update layered window", err))?;

        if !self.visible {
            unsafe {
                let _ = ShowWindow(self.hwnd, SW_SHOWNOACTIVATE);
            }
            self.visible = true;
        }
        Ok(())
    }

    fn release(&mut self) {
        self.release_dib();
        if !self.hwnd.0.is_null() {
            unsafe {
                let _ = DestroyWindow(self.hwnd);
            }
            self.hwnd = HWND::default();
        }
        self.visible = false;
        self.origin = (0, 0);
    }
}

impl Drop for LayeredWindowPresenter {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::overlay_window_ex_style;
    use windows::Win32::UI::WindowsAndMessaging::{
        WS_EX_LAYERED, WS_EX_NOACTIVATE, WS_EX_TOPMOST, WS_EX_TRANSPARENT,
    };

    #[test]
    fn style_flags_are_layered_topmost_and_click_through() {
        let style = overlay_window_ex_style();
        assert_ne!(style.0 & WS_EX_LAYERED.0, 0);
        assert_ne!(style.0 & WS_EX_TOPMOST.0, 0);
        assert_ne!(style.0 & WS_EX_TRANSPARENT.0, 0);
        assert_ne!(style.0 & WS_EX_NOACTIVATE.0, 0);
    }
}
